//! CLI infrastructure for the bellman toolkit
//!
//! This module provides the command-line interface for training action-value
//! tables and inspecting reward models.

pub mod commands;
pub mod config;
pub mod output;
