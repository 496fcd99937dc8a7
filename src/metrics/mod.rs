//! Training curves and per-epoch results.

use crate::error::Result;
use crate::event::{BatchEvent, EpochEvent, EventHandler, TrainingEvent};
use std::path::{Path, PathBuf};

pub mod plot;

pub use plot::Series;

pub const TRAIN_COST: &str = "Train cost";
pub const TEST_COST: &str = "Test cost";
pub const TRAIN_ERROR_RATE: &str = "Train error rate";
pub const TEST_ERROR_RATE: &str = "Test error rate";

pub const COST_PLOT_NAME: &str = "train_test_cost.png";
pub const ERROR_RATE_PLOT_NAME: &str = "train_test_error_rate.png";

/// Held-out metrics of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochResult {
    pub epoch: usize,
    pub cost: f64,
    pub error_rate: f64,
}

impl EpochResult {
    /// Percentage of correctly classified held-out samples.
    pub fn accuracy(&self) -> f64 {
        100.0 - self.error_rate * 100.0
    }
}

/// The epoch with the lowest held-out cost; the earliest one wins ties.
pub fn best_result(results: &[EpochResult]) -> Option<&EpochResult> {
    results.iter().fold(None, |best, result| match best {
        Some(best) if best.cost <= result.cost => Some(best),
        _ if result.cost.is_nan() => best,
        _ => Some(result),
    })
}

/// Collects the four metric series from training events and keeps the plots
/// up to date.
///
/// Train points are sampled every `plot_every` steps, test points once per
/// epoch. Progress lines go to stdout every `log_every` batches and after
/// every evaluation.
#[derive(Debug)]
pub struct MetricsRecorder {
    train_cost: Series,
    test_cost: Series,
    train_error_rate: Series,
    test_error_rate: Series,
    results: Vec<EpochResult>,
    plot_dir: Option<PathBuf>,
    plot_every: usize,
    log_every: usize,
}

impl MetricsRecorder {
    /// Recorder rendering its plots into `plot_dir`.
    pub fn new(plot_dir: impl Into<PathBuf>, plot_every: usize, log_every: usize) -> Self {
        Self {
            plot_dir: Some(plot_dir.into()),
            ..Self::without_plots(plot_every, log_every)
        }
    }

    /// Recorder that only keeps the series in memory.
    pub fn without_plots(plot_every: usize, log_every: usize) -> Self {
        Self {
            train_cost: Series::new(TRAIN_COST),
            test_cost: Series::new(TEST_COST),
            train_error_rate: Series::new(TRAIN_ERROR_RATE),
            test_error_rate: Series::new(TEST_ERROR_RATE),
            results: Vec::new(),
            plot_dir: None,
            plot_every,
            log_every,
        }
    }

    pub fn train_cost(&self) -> &Series {
        &self.train_cost
    }

    pub fn test_cost(&self) -> &Series {
        &self.test_cost
    }

    pub fn train_error_rate(&self) -> &Series {
        &self.train_error_rate
    }

    pub fn test_error_rate(&self) -> &Series {
        &self.test_error_rate
    }

    pub fn results(&self) -> &[EpochResult] {
        &self.results
    }

    pub fn best(&self) -> Option<&EpochResult> {
        best_result(&self.results)
    }

    pub fn cost_plot_path(&self) -> Option<PathBuf> {
        self.plot_dir.as_ref().map(|dir| dir.join(COST_PLOT_NAME))
    }

    pub fn error_rate_plot_path(&self) -> Option<PathBuf> {
        self.plot_dir.as_ref().map(|dir| dir.join(ERROR_RATE_PLOT_NAME))
    }

    fn on_batch(&mut self, event: &BatchEvent) -> Result<()> {
        if is_multiple(event.step, self.plot_every) {
            self.train_cost.push(event.step, event.metrics.cost);
            self.train_error_rate
                .push(event.step, event.metrics.error_rate);
            self.render()?;
        }
        if is_multiple(event.batch, self.log_every) {
            println!(
                "Pass {}, Batch {}, Cost {}, {}",
                event.epoch, event.batch, event.metrics.cost, event.metrics
            );
        }
        Ok(())
    }

    fn on_epoch(&mut self, event: &EpochEvent) -> Result<()> {
        println!(
            "Test with Pass {}, Cost {}, {}",
            event.epoch, event.metrics.cost, event.metrics
        );
        self.test_cost.push(event.step, event.metrics.cost);
        self.test_error_rate
            .push(event.step, event.metrics.error_rate);
        self.results.push(EpochResult {
            epoch: event.epoch,
            cost: event.metrics.cost,
            error_rate: event.metrics.error_rate,
        });
        self.render()
    }

    fn render(&self) -> Result<()> {
        let Some(dir) = &self.plot_dir else {
            return Ok(());
        };
        render_pair(dir, COST_PLOT_NAME, &self.train_cost, &self.test_cost)?;
        render_pair(
            dir,
            ERROR_RATE_PLOT_NAME,
            &self.train_error_rate,
            &self.test_error_rate,
        )
    }
}

impl EventHandler for MetricsRecorder {
    fn handle(&mut self, event: &TrainingEvent) -> Result<()> {
        match event {
            TrainingEvent::Batch(batch) => self.on_batch(batch),
            TrainingEvent::Epoch(epoch) => self.on_epoch(epoch),
        }
    }
}

fn render_pair(dir: &Path, name: &str, train: &Series, test: &Series) -> Result<()> {
    plot::render(&dir.join(name), &[train, test])
}

/// A zero period disables the action.
fn is_multiple(n: usize, period: usize) -> bool {
    period != 0 && n % period == 0
}
