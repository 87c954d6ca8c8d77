//! Memoryless Bellman backup
//!
//! The backup has no explicit transition function: the chosen action index
//! is read as the next state, so the lookahead term is the best value in the
//! action's own row of the table.
//!
//! Q(s,a) ← R(s,a) + γ max_a' Q(a,a')

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    mdp::RewardModel,
    q_learning::value_table::ValueTable,
};

/// Discount factor γ in (0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct DiscountFactor(f64);

impl DiscountFactor {
    pub const DEFAULT: DiscountFactor = DiscountFactor(0.8);

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] unless `0 < value <= 1`.
    pub fn new(value: f64) -> Result<Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(Error::invalid_config(format!(
                "discount factor {value} must lie in (0, 1]"
            )))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for DiscountFactor {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for DiscountFactor {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DiscountFactor> for f64 {
    fn from(discount: DiscountFactor) -> Self {
        discount.0
    }
}

/// Record of one applied backup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateOutcome {
    pub state: usize,
    pub action: usize,
    /// Entry of row `action` whose value was used for the lookahead
    pub next_action: usize,
    /// Value written to `(state, action)`
    pub target: f64,
}

/// Applies Q-learning backups with a fixed discount
#[derive(Debug, Clone, Copy, Default)]
pub struct BellmanUpdater {
    discount: DiscountFactor,
}

impl BellmanUpdater {
    pub fn new(discount: DiscountFactor) -> Self {
        Self { discount }
    }

    pub fn discount(&self) -> DiscountFactor {
        self.discount
    }

    /// Best entry of row `action`, ties broken uniformly at random.
    ///
    /// The random source is only consulted when more than one entry holds
    /// the maximum.
    pub fn best_next<R: Rng>(&self, table: &ValueTable, action: usize, rng: &mut R) -> usize {
        let tied = table.max_actions(action);
        match tied.as_slice() {
            [only] => *only,
            many => many.choose(rng).copied().unwrap_or(0),
        }
    }

    /// Overwrite `(state, action)` with `reward + γ * max(table[action, :])`.
    ///
    /// Legality of `action` is not checked here; callers filter actions
    /// before the backup.
    pub fn update<R: Rng>(
        &self,
        table: &mut ValueTable,
        model: &RewardModel,
        state: usize,
        action: usize,
        rng: &mut R,
    ) -> UpdateOutcome {
        let next_action = self.best_next(table, action, rng);
        let best_next_value = table.get(action, next_action);
        let target = model.reward(state, action) + self.discount.value() * best_next_value;
        table.set(state, action, target);

        UpdateOutcome {
            state,
            action,
            next_action,
            target,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn updater() -> BellmanUpdater {
        BellmanUpdater::new(DiscountFactor::new(0.8).unwrap())
    }

    #[test]
    fn test_discount_bounds() {
        assert!(DiscountFactor::new(1.0).is_ok());
        assert!(DiscountFactor::new(0.01).is_ok());
        assert!(DiscountFactor::new(0.0).is_err());
        assert!(DiscountFactor::new(1.5).is_err());
        assert!(DiscountFactor::new(f64::NAN).is_err());
    }

    #[test]
    fn test_discount_deserialize_validates() {
        let ok: DiscountFactor = serde_json::from_str("0.9").unwrap();
        assert_eq!(ok.value(), 0.9);
        assert!(serde_json::from_str::<DiscountFactor>("-0.2").is_err());
    }

    #[test]
    fn test_update_on_empty_table_is_immediate_reward() {
        let model = RewardModel::reference();
        let mut table = ValueTable::new(6);
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = updater().update(&mut table, &model, 1, 5, &mut rng);

        assert_eq!(outcome.target, 1.0);
        assert_eq!(table.get(1, 5), 1.0);
    }

    #[test]
    fn test_update_uses_action_row_maximum() {
        let model = RewardModel::reference();
        let mut table = ValueTable::new(6);
        table.set(3, 1, 10.0);
        table.set(3, 2, 40.0);
        table.set(3, 4, 20.0);
        // Row 1 must not leak into the lookahead for action 3.
        table.set(1, 0, 1000.0);
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = updater().update(&mut table, &model, 1, 3, &mut rng);

        assert_eq!(outcome.next_action, 2);
        assert_eq!(table.get(1, 3), 1.0 + 0.8 * 40.0);
    }

    #[test]
    fn test_update_overwrites_previous_value() {
        let model = RewardModel::reference();
        let mut table = ValueTable::new(6);
        table.set(0, 4, 999.0);
        let mut rng = StdRng::seed_from_u64(1);

        updater().update(&mut table, &model, 0, 4, &mut rng);

        assert_eq!(table.get(0, 4), 1.0);
    }

    #[test]
    fn test_update_ignores_legality() {
        let model = RewardModel::reference();
        let mut table = ValueTable::new(6);
        table.set(2, 2, 50.0);
        let mut rng = StdRng::seed_from_u64(1);

        // (0, 2) has zero reward and is illegal, the backup still applies.
        updater().update(&mut table, &model, 0, 2, &mut rng);

        assert_eq!(table.get(0, 2), 40.0);
    }

    #[test]
    fn test_ties_broken_randomly() {
        let mut table = ValueTable::new(4);
        table.set(2, 0, 3.0);
        table.set(2, 3, 3.0);
        let mut rng = StdRng::seed_from_u64(5);
        let picks: HashSet<usize> = (0..200)
            .map(|_| updater().best_next(&table, 2, &mut rng))
            .collect();
        assert_eq!(picks, HashSet::from([0, 3]));
    }

    #[test]
    fn test_single_maximum_does_not_consume_randomness() {
        let mut table = ValueTable::new(3);
        table.set(1, 2, 1.0);
        let mut rng = StdRng::seed_from_u64(9);
        let mut untouched = StdRng::seed_from_u64(9);

        assert_eq!(updater().best_next(&table, 1, &mut rng), 2);
        assert_eq!(rng.random::<u64>(), untouched.random::<u64>());
    }

    #[test]
    fn test_repeated_update_reaches_fixed_point() {
        let model = RewardModel::reference();
        let mut table = ValueTable::new(6);
        table.set(3, 2, 80.0);
        let mut rng = StdRng::seed_from_u64(2);

        let expected = 1.0 + 0.8 * 80.0;
        for _ in 0..5 {
            updater().update(&mut table, &model, 1, 3, &mut rng);
            assert_eq!(table.get(1, 3), expected);
        }
    }

    #[test]
    fn test_self_loop_converges_geometrically() {
        // Goal self-transition: Q(2,2) = 100 + 0.8 Q(2,2) converges to 500.
        let model = RewardModel::reference();
        let mut table = ValueTable::new(6);
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..500 {
            updater().update(&mut table, &model, 2, 2, &mut rng);
        }
        assert!((table.get(2, 2) - 500.0).abs() < 1e-9);
    }
}
