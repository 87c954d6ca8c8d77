//! Training pipeline
//!
//! This module provides:
//! - The fixed-budget training loop over a reward model
//! - Observer adapters for progress, metrics and event traces

pub mod observers;
pub mod training;

// Re-export observer implementations (adapters)
pub use observers::{
    JsonlObserver, MetricsObserver, MetricsSummary, ProgressObserver, TraceObserver,
};
pub use training::{
    DEFAULT_ITERATIONS, DEFAULT_START_STATE, LoopPhase, TrainingConfig, TrainingLoop,
    TrainingResult, UpdateEvent, train,
};

pub use crate::ports::Observer;
