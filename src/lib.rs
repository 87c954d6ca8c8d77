//! Tabular Q-learning over a small, fully known MDP
//!
//! This crate provides:
//! - An immutable reward matrix whose positive entries mark legal moves
//! - Uniform legal-action sampling with a defined dead-end fallback
//! - A memoryless Bellman backup where the action index is the next state
//! - A fixed-budget training loop with pluggable observers
//! - A CLI that prints the raw and normalized action-value tables

pub mod cli;
pub mod error;
pub mod mdp;
pub mod pipeline;
pub mod ports;
pub mod q_learning;

pub use error::{Error, Result};
pub use mdp::RewardModel;
pub use pipeline::{TrainingConfig, TrainingLoop, TrainingResult};
pub use q_learning::{ActionSampler, BellmanUpdater, DiscountFactor, FallbackRange, ValueTable};
