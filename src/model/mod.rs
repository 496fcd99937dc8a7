//! Digit classifiers.
//!
//! Every variant maps flattened images `[batch_size, HEIGHT * WIDTH]` to a
//! distribution over the digit classes `[batch_size, num_classes]`.

use crate::data::{FEATURES, NUM_CLASSES};
use crate::error::Error;
use burn::nn::loss::CrossEntropyLoss;
use burn::prelude::*;
use burn::tensor::activation::softmax;
use burn::train::ClassificationOutput;
use std::str::FromStr;

pub mod conv;
pub mod linear;
pub mod mlp;

pub use conv::{ConvNet, ConvNetConfig};
pub use linear::{LinearClassifier, LinearClassifierConfig};
pub use mlp::{Mlp, MlpConfig};

/// The registered model variants.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// One fully-connected softmax layer.
    Linear,
    /// Two ReLU hidden layers (128, 64) and a softmax output layer.
    Mlp,
    /// Two conv/pool/batch-norm stages (20, 50 filters) and a softmax output layer.
    ConvNet,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Linear, ModelKind::Mlp, ModelKind::ConvNet];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Mlp => "mlp",
            ModelKind::ConvNet => "conv",
        }
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "softmax" => Ok(ModelKind::Linear),
            "mlp" => Ok(ModelKind::Mlp),
            "conv" | "cnn" | "convnet" => Ok(ModelKind::ConvNet),
            other => Err(Error::Config(format!(
                "unknown model {other:?}, expected one of: linear, mlp, conv"
            ))),
        }
    }
}

#[derive(Config, Debug)]
pub struct ClassifierConfig {
    #[config(default = "ModelKind::ConvNet")]
    pub kind: ModelKind,
    /// Declared input width; the convolutional variant only supports `HEIGHT * WIDTH`.
    #[config(default = "FEATURES")]
    pub input_size: usize,
    #[config(default = "NUM_CLASSES")]
    pub num_classes: usize,
}

impl ClassifierConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Classifier<B> {
        match self.kind {
            ModelKind::Linear => Classifier::Linear(
                LinearClassifierConfig::new(self.input_size, self.num_classes).init(device),
            ),
            ModelKind::Mlp => {
                Classifier::Mlp(MlpConfig::new(self.input_size, self.num_classes).init(device))
            }
            ModelKind::ConvNet => {
                Classifier::ConvNet(ConvNetConfig::new(self.num_classes).init(device))
            }
        }
    }
}

#[derive(Module, Debug)]
pub enum Classifier<B: Backend> {
    Linear(LinearClassifier<B>),
    Mlp(Mlp<B>),
    ConvNet(ConvNet<B>),
}

impl<B: Backend> Classifier<B> {
    pub fn kind(&self) -> ModelKind {
        match self {
            Classifier::Linear(_) => ModelKind::Linear,
            Classifier::Mlp(_) => ModelKind::Mlp,
            Classifier::ConvNet(_) => ModelKind::ConvNet,
        }
    }

    /// Unnormalized class scores.
    ///
    /// # Shapes
    ///
    /// - images: `[batch_size, HEIGHT * WIDTH]`
    /// - output: `[batch_size, num_classes]`
    pub fn forward_logits(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            Classifier::Linear(model) => model.forward_logits(images),
            Classifier::Mlp(model) => model.forward_logits(images),
            Classifier::ConvNet(model) => model.forward_logits(images),
        }
    }

    /// Class probabilities; each row sums to 1.
    ///
    /// # Shapes
    ///
    /// - images: `[batch_size, HEIGHT * WIDTH]`
    /// - output: `[batch_size, num_classes]`
    pub fn forward(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward_logits(images), 1)
    }

    /// Cross-entropy of the softmax output against the integer targets.
    ///
    /// The loss is computed from the logits, which is the numerically stable
    /// form of the cross-entropy over [`Self::forward`].
    pub fn forward_classification(
        &self,
        images: Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
        loss: &CrossEntropyLoss<B>,
    ) -> ClassificationOutput<B> {
        let logits = self.forward_logits(images);
        let loss = loss.forward(logits.clone(), targets.clone());
        ClassificationOutput::new(loss, logits, targets)
    }
}
