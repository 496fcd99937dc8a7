use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the training harness.
///
/// Nothing is retried: every variant ends the current run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read image {path:?}: {source}")]
    ImageRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode image {path:?}: {source}")]
    ImageDecode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("invalid sample: {0}")]
    InvalidSample(String),

    #[error("shape mismatch in {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("failed to write checkpoint {path:?}: {source}")]
    Checkpoint {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no checkpoint found in {0:?}")]
    CheckpointNotFound(PathBuf),

    #[error("parameter record error: {0}")]
    Record(#[from] burn::record::RecorderError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("unreadable tensor data: {0}")]
    TensorData(String),

    #[error("failed to render plot {path:?}: {source}")]
    Plot {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
