//! Legal-action enumeration and uniform action sampling

use std::{fmt, str::FromStr};

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, mdp::RewardModel};

/// Index range drawn from when a state has no legal actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackRange {
    /// Every state index, `0..N`
    #[default]
    Full,
    /// `0..N-1`, one index short of the state count.
    ///
    /// Kept so runs recorded with the narrower range can be reproduced.
    Reference,
}

impl FallbackRange {
    /// Exclusive upper bound of the fallback draw for `num_states` states
    pub fn upper_bound(self, num_states: usize) -> usize {
        match self {
            FallbackRange::Full => num_states,
            FallbackRange::Reference => num_states.saturating_sub(1).max(1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FallbackRange::Full => "full",
            FallbackRange::Reference => "reference",
        }
    }
}

impl fmt::Display for FallbackRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(FallbackRange::Full),
            "reference" => Ok(FallbackRange::Reference),
            other => Err(Error::ParseFallbackRange {
                input: other.to_string(),
                expected: "full, reference".to_string(),
            }),
        }
    }
}

/// Outcome of a single action draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionChoice {
    pub action: usize,
    /// True when the state had no legal action and the fallback range was used
    pub fallback: bool,
}

/// Samples actions from the legal moves of a [`RewardModel`]
#[derive(Debug, Clone, Copy)]
pub struct ActionSampler<'a> {
    model: &'a RewardModel,
    fallback: FallbackRange,
}

impl<'a> ActionSampler<'a> {
    pub fn new(model: &'a RewardModel) -> Self {
        Self::with_fallback(model, FallbackRange::default())
    }

    pub fn with_fallback(model: &'a RewardModel, fallback: FallbackRange) -> Self {
        Self { model, fallback }
    }

    pub fn fallback(&self) -> FallbackRange {
        self.fallback
    }

    /// Actions with a positive reward from `state`, ascending
    pub fn legal_actions(&self, state: usize) -> Vec<usize> {
        self.model
            .rewards(state)
            .filter(|&(_, reward)| reward > 0.0)
            .map(|(action, _)| action)
            .collect()
    }

    /// Legal actions, or [`Error::EmptyActionSet`] when there are none
    pub fn require_legal_actions(&self, state: usize) -> Result<Vec<usize>> {
        let actions = self.legal_actions(state);
        if actions.is_empty() {
            Err(Error::EmptyActionSet { state })
        } else {
            Ok(actions)
        }
    }

    /// Draw an action uniformly from the legal moves of `state`.
    ///
    /// A state without legal moves draws from the fallback range instead.
    pub fn choose_action<R: Rng>(&self, state: usize, rng: &mut R) -> usize {
        self.choose(state, rng).action
    }

    /// Like [`choose_action`](Self::choose_action), also reporting whether
    /// the fallback range was used.
    pub fn choose<R: Rng>(&self, state: usize, rng: &mut R) -> ActionChoice {
        let drawn = self
            .require_legal_actions(state)
            .map(|actions| actions.choose(rng).copied());
        match drawn {
            Ok(Some(action)) => ActionChoice {
                action,
                fallback: false,
            },
            _ => {
                let upper = self.fallback.upper_bound(self.model.num_states());
                ActionChoice {
                    action: rng.random_range(0..upper),
                    fallback: true,
                }
            }
        }
    }
}
