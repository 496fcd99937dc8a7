use crate::checkpoint::load_checkpoint;
use crate::data::{FEATURES, load_image};
use crate::error::{Error, Result};
use crate::model::{Classifier, ClassifierConfig};
use burn::prelude::*;
use std::path::Path;

/// Predicts digits with a trained classifier.
///
/// Runs on a plain (non-autodiff) backend; nothing is learned while predicting.
#[derive(Debug)]
pub struct Inferencer<B: Backend> {
    model: Classifier<B>,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: Classifier<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Loads the parameters of a checkpoint into a freshly built `config` model.
    pub fn from_checkpoint(
        config: &ClassifierConfig,
        path: impl AsRef<Path>,
        device: &B::Device,
    ) -> Result<Self> {
        let model = load_checkpoint(config, path, device)?;
        Ok(Self::new(model, device.clone()))
    }

    /// Class probabilities of one flattened image.
    pub fn probabilities(&self, image: &[f32]) -> Result<Vec<f32>> {
        if image.len() != FEATURES {
            return Err(Error::ShapeMismatch {
                context: "inference input",
                expected: vec![FEATURES],
                got: vec![image.len()],
            });
        }
        let input = Tensor::<B, 2>::from_data(
            TensorData::new(image.to_vec(), [1, FEATURES]).convert::<B::FloatElem>(),
            &self.device,
        );
        let output = self.model.forward(input);
        output
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| Error::TensorData(format!("{e:?}")))
    }

    /// Index of the most probable class; the lowest index wins ties.
    pub fn predict(&self, image: &[f32]) -> Result<usize> {
        let probabilities = self.probabilities(image)?;
        Ok(most_probable(&probabilities))
    }

    pub fn predict_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let image = load_image(path)?;
        self.predict(&image)
    }
}

fn most_probable(probabilities: &[f32]) -> usize {
    probabilities
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, best_p), (i, &p)| {
            if p > best_p { (i, p) } else { (best, best_p) }
        })
        .0
}
