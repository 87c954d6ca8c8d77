//! Markov decision process description
//!
//! The process has deterministic topology: every action names the state it
//! leads to, and the reward matrix alone decides which moves are legal.

pub mod reward_model;

pub use reward_model::{REFERENCE_REWARDS, RewardModel};
