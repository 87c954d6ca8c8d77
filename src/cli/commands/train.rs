//! Train command - Run Q-learning and print the learned tables

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::to_writer_pretty;

use crate::{
    cli::{
        config::MdpConfig,
        output::{format_indices, format_number, print_kv, print_section, print_table},
    },
    mdp::RewardModel,
    pipeline::{
        JsonlObserver, MetricsObserver, MetricsSummary, ProgressObserver, TraceObserver,
        TrainingConfig, TrainingLoop, TrainingResult,
    },
    q_learning::{ActionSampler, FallbackRange, ValueTable},
};

#[derive(Parser, Debug)]
#[command(
    about = "Learn action values for a reward matrix",
    allow_negative_numbers = true
)]
pub struct TrainArgs {
    /// JSON configuration file (rewards, discount, iterations, seed, start_state, fallback)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Number of random-state iterations [default: 50000]
    #[arg(long, short = 'n')]
    pub iterations: Option<usize>,

    /// Discount factor γ in (0, 1] [default: 0.8]
    #[arg(long, short = 'g')]
    pub discount: Option<f64>,

    /// Random seed for reproducibility
    #[arg(long, short = 's')]
    pub seed: Option<u64>,

    /// State for the demonstration step [default: 1]
    #[arg(long)]
    pub start_state: Option<usize>,

    /// Skip the demonstration step
    #[arg(long, default_value_t = false)]
    pub no_demo: bool,

    /// Fallback range for states without legal actions (full or reference)
    #[arg(long)]
    pub fallback: Option<String>,

    /// Fractional digits when printing tables
    #[arg(long, default_value_t = 2)]
    pub precision: usize,

    /// Hide the progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,

    /// Print legal actions, the demonstration step and periodic updates
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// Iterations between verbose trace lines
    #[arg(long, default_value_t = 10_000)]
    pub trace_interval: usize,

    /// Optional file for JSONL update events
    #[arg(long)]
    pub observations: Option<PathBuf>,

    /// Optional path for writing a summary JSON file
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

/// Learned tables and bookkeeping from a training run
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: RewardModel,
    pub config: TrainingConfig,
    pub table: ValueTable,
    pub result: TrainingResult,
    pub metrics: MetricsSummary,
}

#[derive(Debug, Serialize)]
struct TrainingSummaryFile<'a> {
    num_states: usize,
    discount: f64,
    fallback: String,
    training: &'a TrainingResult,
    metrics: &'a MetricsSummary,
}

fn sanitize_summary_path(raw: &Path) -> PathBuf {
    let mut normalized = raw.to_path_buf();
    let raw_str = raw.as_os_str().to_string_lossy();

    // Treat trailing separators or missing filename as a directory target.
    if raw_str.ends_with(std::path::MAIN_SEPARATOR) || normalized.file_name().is_none() {
        normalized.push("training_summary.json");
        return normalized;
    }

    match normalized.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => normalized,
        _ => {
            normalized.set_extension("json");
            normalized
        }
    }
}

impl TrainArgs {
    /// Command-line values as a config layer over the file
    fn overrides(&self) -> Result<MdpConfig> {
        let fallback = self
            .fallback
            .as_deref()
            .map(str::parse::<FallbackRange>)
            .transpose()?;

        Ok(MdpConfig {
            rewards: None,
            discount: self.discount,
            iterations: self.iterations,
            seed: self.seed,
            start_state: self.start_state,
            fallback,
        })
    }

    fn resolve(&self) -> Result<(RewardModel, TrainingConfig)> {
        let file_config = match &self.config {
            Some(path) => MdpConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => MdpConfig::default(),
        };
        let merged = file_config.merge(self.overrides()?);

        let model = merged.reward_model().context("Invalid reward matrix")?;
        let config = merged
            .training_config(!self.no_demo)
            .context("Invalid training configuration")?;
        Ok((model, config))
    }

    /// Progress bar for the run, drawn unless `--no-progress` was given
    fn progress_observer(&self) -> ProgressObserver {
        if self.no_progress {
            ProgressObserver::hidden()
        } else {
            ProgressObserver::new()
        }
    }
}

/// Validate the configuration and train, without printing tables.
///
/// Configuration errors surface before any backup is applied.
pub fn run(args: &TrainArgs) -> Result<TrainOutcome> {
    let (model, config) = args.resolve()?;

    let mut table = ValueTable::new(model.num_states());
    let mut metrics = MetricsObserver::new(model.num_states());

    let result = {
        let mut training = TrainingLoop::new(&model, config.clone())
            .context("Invalid training configuration")?
            .with_observer(Box::new(&mut metrics));

        training = training.with_observer(Box::new(args.progress_observer()));
        if args.verbose {
            let trace = TraceObserver::stderr(args.trace_interval);
            training = training.with_observer(Box::new(trace));
        }
        if let Some(path) = &args.observations {
            let observer = JsonlObserver::new(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            training = training.with_observer(Box::new(observer));
        }

        training.run(&mut table)?
    };

    Ok(TrainOutcome {
        model,
        config,
        table,
        result,
        metrics: metrics.summary(),
    })
}

fn print_configuration(outcome: &TrainOutcome, verbose: bool) {
    let config = &outcome.config;
    print_section("Q-learning");
    print_kv("States", &outcome.model.num_states().to_string());
    print_kv("Discount", &config.discount.value().to_string());
    print_kv("Iterations", &format_number(config.iterations));
    print_kv(
        "Start state",
        &config
            .start_state
            .map_or_else(|| "none".to_string(), |s| s.to_string()),
    );
    print_kv("Fallback", config.fallback.as_str());
    print_kv(
        "Seed",
        &config
            .seed
            .map_or_else(|| "random".to_string(), |s| s.to_string()),
    );

    if verbose {
        let sampler = ActionSampler::with_fallback(&outcome.model, config.fallback);
        for state in 0..outcome.model.num_states() {
            print_kv(
                &format!("Legal from {state}"),
                &format_indices(&sampler.legal_actions(state)),
            );
        }
    }
}

fn write_summary(path: &Path, outcome: &TrainOutcome) -> Result<PathBuf> {
    let path = sanitize_summary_path(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let summary = TrainingSummaryFile {
        num_states: outcome.model.num_states(),
        discount: outcome.config.discount.value(),
        fallback: outcome.config.fallback.to_string(),
        training: &outcome.result,
        metrics: &outcome.metrics,
    };
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    to_writer_pretty(file, &summary)?;
    Ok(path)
}

pub fn execute(args: TrainArgs) -> Result<()> {
    let outcome = run(&args)?;

    print_configuration(&outcome, args.verbose);

    print_table("Q", &outcome.table, args.precision);
    print_table("Normed Q", &outcome.table.normalized(), args.precision);

    if outcome.result.fallback_draws > 0 {
        println!(
            "\n{} updates drew their action from the fallback range",
            format_number(outcome.result.fallback_draws)
        );
    }

    if let Some(raw) = &args.summary {
        let path = write_summary(raw, &outcome)?;
        println!("\nSummary written to {}", path.display());
    }

    Ok(())
}
