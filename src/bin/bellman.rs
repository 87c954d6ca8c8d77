//! bellman CLI - Tabular Q-learning over a fixed reward matrix
//!
//! This CLI provides:
//! - Training an action-value table with the discrete Bellman backup
//! - Inspecting a reward model's legal moves and goal states

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bellman")]
#[command(version, about = "Q-learning over a known reward matrix", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn action values and print the raw and normalized tables
    Train(bellman::cli::commands::train::TrainArgs),

    /// Show the reward matrix, legal actions and goal states
    Inspect(bellman::cli::commands::inspect::InspectArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => bellman::cli::commands::train::execute(args),
        Commands::Inspect(args) => bellman::cli::commands::inspect::execute(args),
    }
}
