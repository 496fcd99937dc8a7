use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

/// Softmax regression: a single fully-connected layer.
#[derive(Module, Debug)]
pub struct LinearClassifier<B: Backend> {
    pub fc: Linear<B>,
}

#[derive(Config, Debug)]
pub struct LinearClassifierConfig {
    pub input_size: usize,
    pub num_classes: usize,
}

impl LinearClassifierConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> LinearClassifier<B> {
        LinearClassifier {
            fc: LinearConfig::new(self.input_size, self.num_classes)
                .with_bias(true)
                .init(device),
        }
    }
}

impl<B: Backend> LinearClassifier<B> {
    /// # Shapes
    ///
    /// - images: `[batch_size, input_size]`
    /// - output: `[batch_size, num_classes]`
    pub fn forward_logits(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        self.fc.forward(images)
    }
}
