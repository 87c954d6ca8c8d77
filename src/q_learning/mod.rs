//! Tabular Q-learning over a reward matrix
//!
//! The pieces are kept separate so each can be driven on its own:
//!
//! - [`ActionSampler`] enumerates legal actions and draws one uniformly
//! - [`ValueTable`] holds the action-value estimates
//! - [`BellmanUpdater`] applies one backup to a single table cell
//!
//! Randomness is always passed in by the caller, so a seeded
//! [`StdRng`](rand::rngs::StdRng) reproduces a run exactly.
//!
//! ## Usage Example
//!
//! ```
//! use bellman::mdp::RewardModel;
//! use bellman::q_learning::{ActionSampler, BellmanUpdater, DiscountFactor, ValueTable};
//! use rand::{SeedableRng, rngs::StdRng};
//!
//! let model = RewardModel::reference();
//! let mut table = ValueTable::new(model.num_states());
//! let updater = BellmanUpdater::new(DiscountFactor::new(0.8).unwrap());
//! let mut rng = StdRng::seed_from_u64(42);
//!
//! let action = ActionSampler::new(&model).choose_action(1, &mut rng);
//! updater.update(&mut table, &model, 1, action, &mut rng);
//! assert_eq!(table.get(1, action), 1.0);
//! ```

pub mod bellman;
pub mod sampler;
pub mod value_table;

// Public re-exports
pub use bellman::{BellmanUpdater, DiscountFactor, UpdateOutcome};
pub use sampler::{ActionChoice, ActionSampler, FallbackRange};
pub use value_table::{TableDisplay, ValueTable};
