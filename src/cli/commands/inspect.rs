//! Inspect command - Show the reward model and its legal moves

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    cli::{
        config::MdpConfig,
        output::{format_indices, print_kv, print_section, print_subsection},
    },
    mdp::RewardModel,
    q_learning::ActionSampler,
};

#[derive(Parser, Debug)]
#[command(about = "Show the reward matrix, legal actions and goal states")]
pub struct InspectArgs {
    /// JSON configuration file providing `rewards`
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

/// Per-state view of a reward model
#[derive(Debug, Clone, PartialEq)]
pub struct StateReport {
    pub state: usize,
    pub legal_actions: Vec<usize>,
    pub is_goal: bool,
}

pub fn load_model(config: Option<&PathBuf>) -> Result<RewardModel> {
    let config = match config {
        Some(path) => MdpConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MdpConfig::default(),
    };
    config.reward_model().context("Invalid reward matrix")
}

pub fn state_reports(model: &RewardModel) -> Vec<StateReport> {
    let sampler = ActionSampler::new(model);
    let goals = model.goal_states();
    (0..model.num_states())
        .map(|state| StateReport {
            state,
            legal_actions: sampler.legal_actions(state),
            is_goal: goals.contains(&state),
        })
        .collect()
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let model = load_model(args.config.as_ref())?;

    print_section("Reward model");
    for state in 0..model.num_states() {
        let row: Vec<String> = model.rewards(state).map(|(_, r)| format!("{r:>5}")).collect();
        println!("  [{}]", row.join(" "));
    }

    print_subsection("Legal actions");
    for report in state_reports(&model) {
        let mut value = format_indices(&report.legal_actions);
        if report.legal_actions.is_empty() {
            value.push_str("  (dead end, fallback sampling)");
        }
        if report.is_goal {
            value.push_str("  (goal)");
        }
        print_kv(&format!("State {}", report.state), &value);
    }

    Ok(())
}
