//! Fixed-budget training loop

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    mdp::RewardModel,
    ports::Observer,
    q_learning::{ActionSampler, BellmanUpdater, DiscountFactor, FallbackRange, ValueTable},
};

/// Number of random-restart backups in a default run
pub const DEFAULT_ITERATIONS: usize = 50_000;

/// State the demonstration step starts from by default
pub const DEFAULT_START_STATE: usize = 1;

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of random-state backups after the demonstration step
    pub iterations: usize,

    /// Discount factor γ
    pub discount: DiscountFactor,

    /// Random seed
    pub seed: Option<u64>,

    /// Forced state for the demonstration step, `None` skips it
    pub start_state: Option<usize>,

    /// Fallback range for states without legal actions
    pub fallback: FallbackRange,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            discount: DiscountFactor::default(),
            seed: None,
            start_state: Some(DEFAULT_START_STATE),
            fallback: FallbackRange::default(),
        }
    }
}

/// Lifecycle of a [`TrainingLoop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Init,
    Running,
    Done,
}

/// One backup as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UpdateEvent {
    /// 0-based index among the random-state iterations (0 for forced steps)
    pub iteration: usize,
    /// Whether the state was forced rather than drawn
    pub forced: bool,
    pub state: usize,
    pub action: usize,
    /// Lookahead entry chosen in row `action`
    pub next_action: usize,
    pub target: f64,
    /// Whether the action came from the fallback range
    pub fallback: bool,
}

/// Result of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingResult {
    /// Random-state iterations run
    pub iterations: usize,

    /// Whether the demonstration step ran
    pub demonstration: bool,

    /// Total backups applied
    pub total_updates: usize,

    /// Backups whose action came from the fallback range
    pub fallback_draws: usize,

    /// Largest value in the final table
    pub max_value: f64,

    /// Seed the run was started with, when one was given
    pub seed: Option<u64>,
}

fn build_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut rand::rng())
    }
}

/// Drives sample-then-backup steps over a [`ValueTable`]
///
/// The loop owns its random source and borrows the model; the table is lent
/// in by the caller for each call, so nothing outlives the run.
pub struct TrainingLoop<'a> {
    model: &'a RewardModel,
    config: TrainingConfig,
    sampler: ActionSampler<'a>,
    updater: BellmanUpdater,
    rng: StdRng,
    phase: LoopPhase,
    observers: Vec<Box<dyn Observer + 'a>>,
}

impl<'a> TrainingLoop<'a> {
    /// Create a training loop over `model`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateOutOfRange`] if the configured start state does
    /// not exist in `model`.
    pub fn new(model: &'a RewardModel, config: TrainingConfig) -> Result<Self> {
        if let Some(start) = config.start_state {
            model.check_state(start)?;
        }

        Ok(Self {
            model,
            sampler: ActionSampler::with_fallback(model, config.fallback),
            updater: BellmanUpdater::new(config.discount),
            rng: build_rng(config.seed),
            phase: LoopPhase::Init,
            observers: Vec::new(),
            config,
        })
    }

    /// Add an observer to the loop
    pub fn with_observer(mut self, observer: Box<dyn Observer + 'a>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Apply one sample-then-backup step from a forced `state`.
    ///
    /// A loop still in [`LoopPhase::Init`] moves to [`LoopPhase::Running`];
    /// only [`run`](Self::run) reaches [`LoopPhase::Done`].
    pub fn step(&mut self, table: &mut ValueTable, state: usize) -> Result<UpdateEvent> {
        self.check_table(table)?;
        self.model.check_state(state)?;
        if self.phase == LoopPhase::Init {
            self.phase = LoopPhase::Running;
        }
        self.apply(table, state, 0, true)
    }

    /// Run the demonstration step (if configured) followed by the full
    /// iteration budget.
    ///
    /// There is no convergence test: the loop always performs exactly
    /// `iterations` random-state backups.
    pub fn run(&mut self, table: &mut ValueTable) -> Result<TrainingResult> {
        self.check_table(table)?;

        let demonstration = self.config.start_state.is_some();
        let total_updates = self.config.iterations + usize::from(demonstration);
        for observer in &mut self.observers {
            observer.on_training_start(total_updates)?;
        }

        self.phase = LoopPhase::Running;
        let mut fallback_draws = 0;

        if let Some(start) = self.config.start_state {
            let event = self.apply(table, start, 0, true)?;
            fallback_draws += usize::from(event.fallback);
        }

        let num_states = self.model.num_states();
        for iteration in 0..self.config.iterations {
            let state = self.rng.random_range(0..num_states);
            let event = self.apply(table, state, iteration, false)?;
            fallback_draws += usize::from(event.fallback);
        }

        self.phase = LoopPhase::Done;

        let result = TrainingResult {
            iterations: self.config.iterations,
            demonstration,
            total_updates,
            fallback_draws,
            max_value: table.max_value(),
            seed: self.config.seed,
        };

        for observer in &mut self.observers {
            observer.on_training_end(&result)?;
        }

        Ok(result)
    }

    fn apply(
        &mut self,
        table: &mut ValueTable,
        state: usize,
        iteration: usize,
        forced: bool,
    ) -> Result<UpdateEvent> {
        let choice = self.sampler.choose(state, &mut self.rng);
        let outcome = self
            .updater
            .update(table, self.model, state, choice.action, &mut self.rng);

        let event = UpdateEvent {
            iteration,
            forced,
            state,
            action: outcome.action,
            next_action: outcome.next_action,
            target: outcome.target,
            fallback: choice.fallback,
        };

        for observer in &mut self.observers {
            observer.on_update(&event)?;
        }

        Ok(event)
    }

    fn check_table(&self, table: &ValueTable) -> Result<()> {
        if table.num_states() == self.model.num_states() {
            Ok(())
        } else {
            Err(Error::invalid_config(format!(
                "value table has {} states but the reward model has {}",
                table.num_states(),
                self.model.num_states()
            )))
        }
    }
}

/// Train a fresh table over `model` and return it with the run summary.
pub fn train(model: &RewardModel, config: TrainingConfig) -> Result<(ValueTable, TrainingResult)> {
    let mut table = ValueTable::new(model.num_states());
    let result = TrainingLoop::new(model, config)?.run(&mut table)?;
    Ok((table, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(iterations: usize, seed: u64) -> TrainingConfig {
        TrainingConfig {
            iterations,
            seed: Some(seed),
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_phases() {
        let model = RewardModel::reference();
        let mut table = ValueTable::new(6);
        let mut training = TrainingLoop::new(&model, seeded(10, 1)).unwrap();
        assert_eq!(training.phase(), LoopPhase::Init);
        training.run(&mut table).unwrap();
        assert_eq!(training.phase(), LoopPhase::Done);
    }

    #[test]
    fn test_update_count() {
        let model = RewardModel::reference();
        let (_, result) = train(&model, seeded(25, 1)).unwrap();
        assert_eq!(result.iterations, 25);
        assert!(result.demonstration);
        assert_eq!(result.total_updates, 26);
        assert_eq!(result.fallback_draws, 0);
    }

    #[test]
    fn test_zero_iterations_runs_demonstration_only() {
        let model = RewardModel::reference();
        let (table, result) = train(&model, seeded(0, 3)).unwrap();
        assert_eq!(result.total_updates, 1);
        let nonzero: Vec<(usize, usize)> = (0..6)
            .flat_map(|s| (0..6).map(move |a| (s, a)))
            .filter(|&(s, a)| table.get(s, a) != 0.0)
            .collect();
        assert_eq!(nonzero.len(), 1);
        assert_eq!(nonzero[0].0, 1);
    }

    #[test]
    fn test_rejects_out_of_range_start() {
        let model = RewardModel::reference();
        let config = TrainingConfig {
            start_state: Some(6),
            ..TrainingConfig::default()
        };
        assert!(matches!(
            TrainingLoop::new(&model, config),
            Err(Error::StateOutOfRange { state: 6, .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_table() {
        let model = RewardModel::reference();
        let mut table = ValueTable::new(4);
        let mut training = TrainingLoop::new(&model, seeded(1, 1)).unwrap();
        assert!(matches!(
            training.run(&mut table),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_step_from_forced_state() {
        let model = RewardModel::reference();
        let mut table = ValueTable::new(6);
        let mut training = TrainingLoop::new(&model, seeded(0, 8)).unwrap();
        let event = training.step(&mut table, 1).unwrap();
        assert!(event.forced);
        assert!([3, 5].contains(&event.action));
        assert_eq!(table.get(1, event.action), 1.0);
    }

    #[test]
    fn test_step_enters_running_phase() {
        let model = RewardModel::reference();
        let mut table = ValueTable::new(6);
        let mut training = TrainingLoop::new(&model, seeded(0, 8)).unwrap();
        training.step(&mut table, 1).unwrap();
        assert_eq!(training.phase(), LoopPhase::Running);

        training.run(&mut table).unwrap();
        assert_eq!(training.phase(), LoopPhase::Done);
    }

    #[test]
    fn test_failed_step_stays_in_init() {
        let model = RewardModel::reference();
        let mut table = ValueTable::new(6);
        let mut training = TrainingLoop::new(&model, seeded(0, 8)).unwrap();
        assert!(training.step(&mut table, 9).is_err());
        assert_eq!(training.phase(), LoopPhase::Init);
    }
}
