//! Immutable reward matrix for a deterministic-topology MDP

use crate::{Error, Result};

/// Reward matrix of the six-state reference graph (states A-F).
///
/// Row `s`, column `a` is the reward for moving from `s` to `a`. State 2 (C)
/// is the goal: its self-transition carries the large reward.
pub const REFERENCE_REWARDS: [[f64; 6]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0, 0.0, 1.0],
    [0.0, 0.0, 100.0, 1.0, 0.0, 0.0],
    [0.0, 1.0, 1.0, 0.0, 1.0, 0.0],
    [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
];

/// Square reward matrix indexed by `(state, action)`.
///
/// Actions and states share one index space: taking action `a` moves the
/// agent to state `a`. The transition function is therefore implicit in the
/// matrix, and a positive entry is what makes a move legal.
///
/// The model is built once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardModel {
    num_states: usize,
    /// Row-major `num_states * num_states` rewards
    rewards: Vec<f64>,
}

impl RewardModel {
    /// Build a model from matrix rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the matrix is empty, not
    /// square, or holds a non-finite reward.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let num_states = rows.len();
        if num_states == 0 {
            return Err(Error::invalid_config("reward matrix has no states"));
        }

        let mut rewards = Vec::with_capacity(num_states * num_states);
        for (state, row) in rows.into_iter().enumerate() {
            if row.len() != num_states {
                return Err(Error::invalid_config(format!(
                    "reward matrix is not square: row {state} has {} entries, expected {num_states}",
                    row.len()
                )));
            }
            if let Some(action) = row.iter().position(|r| !r.is_finite()) {
                return Err(Error::invalid_config(format!(
                    "reward ({state}, {action}) is not finite"
                )));
            }
            rewards.extend(row);
        }

        Ok(Self {
            num_states,
            rewards,
        })
    }

    /// The six-state reference graph with goal state 2.
    pub fn reference() -> Self {
        Self {
            num_states: REFERENCE_REWARDS.len(),
            rewards: REFERENCE_REWARDS.iter().flatten().copied().collect(),
        }
    }

    /// Number of states (and actions)
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Immediate reward for taking `action` from `state`.
    ///
    /// # Panics
    ///
    /// Panics if either index is outside `0..num_states()`.
    pub fn reward(&self, state: usize, action: usize) -> f64 {
        assert!(
            state < self.num_states && action < self.num_states,
            "({state}, {action}) outside a {n}x{n} reward model",
            n = self.num_states
        );
        self.rewards[state * self.num_states + action]
    }

    /// All `(action, reward)` pairs for `state`, ordered by action.
    ///
    /// # Panics
    ///
    /// Panics if `state` is outside `0..num_states()`.
    pub fn rewards(&self, state: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        assert!(
            state < self.num_states,
            "state {state} outside a {n}x{n} reward model",
            n = self.num_states
        );
        let start = state * self.num_states;
        self.rewards[start..start + self.num_states]
            .iter()
            .copied()
            .enumerate()
    }

    /// Whether `action` may be taken from `state`
    pub fn is_legal(&self, state: usize, action: usize) -> bool {
        self.reward(state, action) > 0.0
    }

    /// States whose self-transition is rewarded.
    pub fn goal_states(&self) -> Vec<usize> {
        (0..self.num_states)
            .filter(|&state| self.is_legal(state, state))
            .collect()
    }

    /// Check that `state` indexes this model.
    pub fn check_state(&self, state: usize) -> Result<()> {
        if state < self.num_states {
            Ok(())
        } else {
            Err(Error::StateOutOfRange {
                state,
                num_states: self.num_states,
            })
        }
    }
}

impl Default for RewardModel {
    fn default() -> Self {
        Self::reference()
    }
}
