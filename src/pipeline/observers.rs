//! Observer adapters for the training loop
//!
//! Observers allow composable data collection during training without coupling
//! the loop to specific output formats.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    pipeline::training::{TrainingResult, UpdateEvent},
    ports::Observer,
};

/// Progress bar observer - Shows training progress on stderr
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    hidden: bool,
}

impl ProgressObserver {
    /// Create a new progress observer
    pub fn new() -> Self {
        Self {
            progress_bar: None,
            hidden: false,
        }
    }

    /// Observer that tracks progress without drawing anything
    pub fn hidden() -> Self {
        Self {
            progress_bar: None,
            hidden: true,
        }
    }

    /// Current bar position, if training has started
    #[cfg(test)]
    pub(crate) fn position(&self) -> Option<u64> {
        self.progress_bar.as_ref().map(ProgressBar::position)
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_training_start(&mut self, total_updates: usize) -> Result<()> {
        let pb = ProgressBar::new(total_updates as u64);
        if self.hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} updates ({msg})")
                .map_err(|e| crate::Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_update(&mut self, event: &UpdateEvent) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
            if event.forced {
                pb.set_message(format!("start {}", event.state));
            }
        }
        Ok(())
    }

    fn on_training_end(&mut self, result: &TrainingResult) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(format!("max Q {:.2}", result.max_value));
        }
        Ok(())
    }
}

/// Summary of training metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_updates: usize,
    pub forced_updates: usize,
    pub fallback_draws: usize,
    /// Backups per state, indexed by state
    pub state_visits: Vec<usize>,
    /// Backups per `(state, action)`, row-major
    pub action_visits: Vec<Vec<usize>>,
    /// Largest target written during the run
    pub max_target: f64,
}

/// Metrics observer - Tracks how often each cell is backed up
pub struct MetricsObserver {
    num_states: usize,
    forced_updates: usize,
    fallback_draws: usize,
    action_visits: Vec<Vec<usize>>,
    max_target: f64,
}

impl MetricsObserver {
    /// Create a metrics observer for a model with `num_states` states
    pub fn new(num_states: usize) -> Self {
        Self {
            num_states,
            forced_updates: 0,
            fallback_draws: 0,
            action_visits: vec![vec![0; num_states]; num_states],
            max_target: f64::NEG_INFINITY,
        }
    }

    pub fn total_updates(&self) -> usize {
        self.action_visits.iter().flatten().sum()
    }

    /// Backups applied from `state`
    pub fn state_visits(&self, state: usize) -> usize {
        self.action_visits[state].iter().sum()
    }

    /// Backups applied to `(state, action)`
    pub fn action_visits(&self, state: usize, action: usize) -> usize {
        self.action_visits[state][action]
    }

    /// Get metrics summary
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_updates: self.total_updates(),
            forced_updates: self.forced_updates,
            fallback_draws: self.fallback_draws,
            state_visits: (0..self.num_states)
                .map(|s| self.state_visits(s))
                .collect(),
            action_visits: self.action_visits.clone(),
            max_target: self.max_target,
        }
    }
}

impl Observer for MetricsObserver {
    fn on_training_start(&mut self, _total_updates: usize) -> Result<()> {
        *self = Self::new(self.num_states);
        Ok(())
    }

    fn on_update(&mut self, event: &UpdateEvent) -> Result<()> {
        self.action_visits[event.state][event.action] += 1;
        self.forced_updates += usize::from(event.forced);
        self.fallback_draws += usize::from(event.fallback);
        self.max_target = self.max_target.max(event.target);
        Ok(())
    }
}

/// Trace observer - Writes a line for forced steps and every `interval`
/// iterations to the given writer
pub struct TraceObserver<W: Write> {
    writer: W,
    interval: usize,
}

impl TraceObserver<std::io::Stderr> {
    /// Trace to stderr
    pub fn stderr(interval: usize) -> Self {
        Self::new(std::io::stderr(), interval)
    }
}

impl<W: Write> TraceObserver<W> {
    pub fn new(writer: W, interval: usize) -> Self {
        Self {
            writer,
            interval: interval.max(1),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Observer for TraceObserver<W> {
    fn on_training_start(&mut self, total_updates: usize) -> Result<()> {
        writeln!(self.writer, "training: {total_updates} updates scheduled")?;
        Ok(())
    }

    fn on_update(&mut self, event: &UpdateEvent) -> Result<()> {
        if event.forced {
            writeln!(
                self.writer,
                "start state {}: action {} -> Q({}, {}) = {:.4}",
                event.state, event.action, event.state, event.action, event.target
            )?;
        } else if (event.iteration + 1).is_multiple_of(self.interval) {
            writeln!(
                self.writer,
                "iteration {}: Q({}, {}) = {:.4}{}",
                event.iteration + 1,
                event.state,
                event.action,
                event.target,
                if event.fallback { " (fallback)" } else { "" }
            )?;
        }
        Ok(())
    }

    fn on_training_end(&mut self, result: &TrainingResult) -> Result<()> {
        writeln!(
            self.writer,
            "training done: {} updates, {} fallback draws, max Q {:.4}",
            result.total_updates, result.fallback_draws, result.max_value
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

/// JSONL observer - Writes every update event as one JSON object per line
pub struct JsonlObserver {
    writer: BufWriter<File>,
}

impl JsonlObserver {
    /// Create a new JSONL observer
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl Observer for JsonlObserver {
    fn on_update(&mut self, event: &UpdateEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        writeln!(&mut self.writer)?;
        Ok(())
    }

    fn on_training_end(&mut self, _result: &TrainingResult) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
