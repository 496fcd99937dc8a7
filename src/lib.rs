//! Handwritten digit classification on MNIST with burn.
//!
//! Three interchangeable classifiers (softmax regression, a two-layer
//! perceptron and a small convolutional network) share one training harness:
//! per-epoch checkpoints, metric curves and single-image inference.

pub mod backend;
pub mod checkpoint;
pub mod config;
pub mod data;
pub mod error;
pub mod event;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod optim;
pub mod setup;
pub mod training;

pub use error::{Error, Result};

pub mod prelude {
    pub use crate::checkpoint::CheckpointStore;
    pub use crate::config::TrainingConfig;
    pub use crate::data::{MnistDataset, Sample};
    pub use crate::event::{EventHandler, Metrics, TrainingEvent};
    pub use crate::inference::Inferencer;
    pub use crate::metrics::{EpochResult, MetricsRecorder, best_result};
    pub use crate::model::{Classifier, ClassifierConfig, ModelKind};
    pub use crate::optim::OptimizerConfig;
    pub use crate::setup::TrainingSetup;
    pub use crate::training::{Trainer, TrainerState};
}
