//! Configuration file support for CLI commands

use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    mdp::RewardModel,
    pipeline::{DEFAULT_ITERATIONS, DEFAULT_START_STATE, TrainingConfig},
    q_learning::{DiscountFactor, FallbackRange},
};

/// Settings read from a JSON configuration file
///
/// Every field is optional; missing fields fall back to the reference run.
///
/// ```json
/// {
///   "rewards": [[0, 1], [1, 10]],
///   "discount": 0.9,
///   "iterations": 1000,
///   "seed": 7,
///   "start_state": 0,
///   "fallback": "reference"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MdpConfig {
    /// Square reward matrix, rows are source states
    pub rewards: Option<Vec<Vec<f64>>>,

    /// Discount factor γ in (0, 1]
    pub discount: Option<f64>,

    /// Random-state iterations
    pub iterations: Option<usize>,

    /// Random seed for reproducibility
    pub seed: Option<u64>,

    /// Demonstration start state
    pub start_state: Option<usize>,

    /// Dead-end fallback range
    pub fallback: Option<FallbackRange>,
}

impl MdpConfig {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open config {}", path.display()),
            source,
        })?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Fields set in `other` replace the ones in `self`
    pub fn merge(self, other: MdpConfig) -> MdpConfig {
        MdpConfig {
            rewards: other.rewards.or(self.rewards),
            discount: other.discount.or(self.discount),
            iterations: other.iterations.or(self.iterations),
            seed: other.seed.or(self.seed),
            start_state: other.start_state.or(self.start_state),
            fallback: other.fallback.or(self.fallback),
        }
    }

    /// Build the reward model, defaulting to the reference graph
    pub fn reward_model(&self) -> Result<RewardModel> {
        match &self.rewards {
            Some(rows) => RewardModel::from_rows(rows.clone()),
            None => Ok(RewardModel::reference()),
        }
    }

    /// Validate and resolve into a training configuration.
    ///
    /// `demonstration` controls whether a start state is used at all.
    pub fn training_config(&self, demonstration: bool) -> Result<TrainingConfig> {
        let discount = match self.discount {
            Some(value) => DiscountFactor::new(value)?,
            None => DiscountFactor::default(),
        };

        Ok(TrainingConfig {
            iterations: self.iterations.unwrap_or(DEFAULT_ITERATIONS),
            discount,
            seed: self.seed,
            start_state: demonstration
                .then(|| self.start_state.unwrap_or(DEFAULT_START_STATE)),
            fallback: self.fallback.unwrap_or_default(),
        })
    }
}
