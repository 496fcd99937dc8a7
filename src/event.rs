//! Notifications emitted by the trainer.
//!
//! Events are delivered synchronously, in order, to a single [`EventHandler`].

use crate::error::Result;
use std::fmt;
use std::path::PathBuf;

/// Averaged cost and classification error of a batch or of an evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub cost: f64,
    /// Fraction of misclassified samples, in between 0.0 and 1.0.
    pub error_rate: f64,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{classification_error_evaluator: {}}}", self.error_rate)
    }
}

/// Emitted after every optimizer step.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEvent {
    pub epoch: usize,
    /// Batch index within the epoch.
    pub batch: usize,
    /// Optimizer steps taken since training started, before this one.
    pub step: usize,
    pub metrics: Metrics,
}

/// Emitted once the epoch checkpoint is written and the held-out set evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochEvent {
    pub epoch: usize,
    /// Optimizer steps taken since training started.
    pub step: usize,
    /// Evaluation metrics on the held-out set.
    pub metrics: Metrics,
    pub checkpoint: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    Batch(BatchEvent),
    Epoch(EpochEvent),
}

/// Receives every [`TrainingEvent`]; an error aborts the training run.
pub trait EventHandler {
    fn handle(&mut self, event: &TrainingEvent) -> Result<()>;
}

impl<F> EventHandler for F
where
    F: FnMut(&TrainingEvent) -> Result<()>,
{
    fn handle(&mut self, event: &TrainingEvent) -> Result<()> {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_display_as_an_evaluator_map() {
        let metrics = Metrics {
            cost: 0.3,
            error_rate: 0.125,
        };
        assert_eq!(
            metrics.to_string(),
            "{classification_error_evaluator: 0.125}"
        );
    }

    #[test]
    fn closures_handle_events() {
        let mut seen = Vec::new();
        let mut handler = |event: &TrainingEvent| -> Result<()> {
            if let TrainingEvent::Batch(batch) = event {
                seen.push(batch.step);
            }
            Ok(())
        };
        let metrics = Metrics {
            cost: 1.0,
            error_rate: 0.5,
        };
        for step in 0..3 {
            let event = TrainingEvent::Batch(BatchEvent {
                epoch: 0,
                batch: step,
                step,
                metrics,
            });
            handler.handle(&event).unwrap();
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
