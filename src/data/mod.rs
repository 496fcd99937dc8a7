use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub mod batcher;
pub mod image_loader;
pub mod mnist;
pub mod shuffle;

pub use batcher::{MnistBatch, MnistBatcher};
pub use image_loader::{load_image, pixels_from_gray};
pub use mnist::{MnistDataset, Split};
pub use shuffle::ShuffleBuffer;

pub const WIDTH: usize = 28;
pub const HEIGHT: usize = 28;
/// Length of a flattened image.
pub const FEATURES: usize = WIDTH * HEIGHT;
/// One class per digit.
pub const NUM_CLASSES: usize = 10;

/// A flattened grayscale digit with its label.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Sample {
    /// Brightness per pixel, in between 0.0 and 1.0.
    ///
    /// # Shape
    /// [WIDTH * HEIGHT]
    image: Vec<f32>,

    /// In between 0 and 9.
    label: u8,
}

impl Sample {
    pub fn new(image: Vec<f32>, label: u8) -> Result<Self> {
        if image.len() != FEATURES {
            return Err(Error::InvalidSample(format!(
                "expected {FEATURES} pixels, got {}",
                image.len()
            )));
        }
        if usize::from(label) >= NUM_CLASSES {
            return Err(Error::InvalidSample(format!(
                "label {label} is not a digit"
            )));
        }
        if let Some(pixel) = image.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(Error::InvalidSample(format!(
                "pixel {pixel} is outside of [0, 1]"
            )));
        }
        Ok(Self { image, label })
    }

    pub fn image(&self) -> &[f32] {
        &self.image
    }

    pub fn label(&self) -> u8 {
        self.label
    }
}
