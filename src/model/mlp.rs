use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Multilayer perceptron with two ReLU hidden layers.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    pub hidden1: Linear<B>,
    pub hidden2: Linear<B>,
    pub output: Linear<B>,
    pub activation: Relu,
}

#[derive(Config, Debug)]
pub struct MlpConfig {
    pub input_size: usize,
    pub num_classes: usize,
    #[config(default = 128)]
    pub hidden1_size: usize,
    #[config(default = 64)]
    pub hidden2_size: usize,
}

impl MlpConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mlp<B> {
        Mlp {
            hidden1: LinearConfig::new(self.input_size, self.hidden1_size).init(device),
            hidden2: LinearConfig::new(self.hidden1_size, self.hidden2_size).init(device),
            output: LinearConfig::new(self.hidden2_size, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> Mlp<B> {
    /// # Shapes
    ///
    /// - images: `[batch_size, input_size]`
    /// - output: `[batch_size, num_classes]`
    pub fn forward_logits(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.hidden1.forward(images));
        let x = self.activation.forward(self.hidden2.forward(x));
        self.output.forward(x)
    }
}
