//! Observer port - abstraction for training observation
//!
//! This port defines the interface for observing training events, so the
//! training loop can report progress and collect metrics without coupling
//! to any particular output.

use crate::{
    Result,
    pipeline::{TrainingResult, UpdateEvent},
};

/// Observer trait for monitoring training
///
/// # Event Sequence
///
/// 1. `on_training_start(total_updates)` - once, before the first backup
/// 2. `on_update(event)` - after every backup, the demonstration step included
/// 3. `on_training_end(result)` - once, after the budget is exhausted
///
/// # Examples
///
/// ```no_run
/// use bellman::{pipeline::UpdateEvent, ports::Observer};
///
/// struct GoalCounter {
///     goal_updates: usize,
/// }
///
/// impl Observer for GoalCounter {
///     fn on_update(&mut self, event: &UpdateEvent) -> bellman::Result<()> {
///         if event.action == 2 {
///             self.goal_updates += 1;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Observer {
    /// Called once before training, with the number of backups that will run.
    fn on_training_start(&mut self, _total_updates: usize) -> Result<()> {
        Ok(())
    }

    /// Called after each backup has been written to the table.
    fn on_update(&mut self, _event: &UpdateEvent) -> Result<()> {
        Ok(())
    }

    /// Called once when the loop reaches its done phase.
    fn on_training_end(&mut self, _result: &TrainingResult) -> Result<()> {
        Ok(())
    }
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn on_training_start(&mut self, total_updates: usize) -> Result<()> {
        (**self).on_training_start(total_updates)
    }

    fn on_update(&mut self, event: &UpdateEvent) -> Result<()> {
        (**self).on_update(event)
    }

    fn on_training_end(&mut self, result: &TrainingResult) -> Result<()> {
        (**self).on_training_end(result)
    }
}
