use crate::data::{HEIGHT, WIDTH};
use burn::nn::{
    BatchNorm, BatchNormConfig, Linear, LinearConfig, Relu,
    conv::{Conv2d, Conv2dConfig},
    pool::{MaxPool2d, MaxPool2dConfig},
};
use burn::prelude::*;

/// One `conv → max-pool → batch-norm → relu` stage.
#[derive(Module, Debug)]
pub struct ConvPoolNorm<B: Backend> {
    pub conv: Conv2d<B>,
    pub pool: MaxPool2d,
    pub norm: BatchNorm<B>,
    pub activation: Relu,
}

#[derive(Config, Debug)]
pub struct ConvPoolNormConfig {
    pub channels_in: usize,
    pub filters: usize,
    #[config(default = 5)]
    pub kernel_size: usize,
    #[config(default = 2)]
    pub pool_size: usize,
}

impl ConvPoolNormConfig {
    /// Returns the initialized stage.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvPoolNorm<B> {
        ConvPoolNorm {
            conv: Conv2dConfig::new(
                [self.channels_in, self.filters],
                [self.kernel_size, self.kernel_size],
            )
            .init(device),
            pool: MaxPool2dConfig::new([self.pool_size, self.pool_size])
                .with_strides([self.pool_size, self.pool_size])
                .init(),
            norm: BatchNormConfig::new(self.filters).init(device),
            activation: Relu::new(),
        }
    }

    /// Side length of the square output for a square input of side `size`.
    pub fn output_size(&self, size: usize) -> usize {
        (size - self.kernel_size + 1) / self.pool_size
    }
}

impl<B: Backend> ConvPoolNorm<B> {
    /// # Shapes
    ///
    /// - input: `[batch_size, channels_in, height, width]`
    /// - output: `[batch_size, filters, (height - kernel + 1) / pool, (width - kernel + 1) / pool]`
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(input);
        let x = self.pool.forward(x);
        let x = self.norm.forward(x);
        self.activation.forward(x)
    }
}

/// Two convolutional stages feeding a fully-connected output layer.
#[derive(Module, Debug)]
pub struct ConvNet<B: Backend> {
    pub stage1: ConvPoolNorm<B>,
    pub stage2: ConvPoolNorm<B>,
    pub fc: Linear<B>,
}

#[derive(Config, Debug)]
pub struct ConvNetConfig {
    pub num_classes: usize,
    #[config(default = 20)]
    pub filters1: usize,
    #[config(default = 50)]
    pub filters2: usize,
}

impl ConvNetConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvNet<B> {
        let stage1 = ConvPoolNormConfig::new(1, self.filters1);
        let stage2 = ConvPoolNormConfig::new(self.filters1, self.filters2);
        // 28 → 24 → 12 → 8 → 4
        let side = stage2.output_size(stage1.output_size(HEIGHT));
        debug_assert_eq!(HEIGHT, WIDTH);

        ConvNet {
            stage1: stage1.init(device),
            stage2: stage2.init(device),
            fc: LinearConfig::new(self.filters2 * side * side, self.num_classes).init(device),
        }
    }
}

impl<B: Backend> ConvNet<B> {
    /// # Shapes
    ///
    /// - images: `[batch_size, HEIGHT * WIDTH]`
    /// - output: `[batch_size, num_classes]`
    pub fn forward_logits(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch_size, _features] = images.dims();
        let x = images.reshape([batch_size, 1, HEIGHT, WIDTH]);

        let x = self.stage1.forward(x);
        let x = self.stage2.forward(x);
        let x: Tensor<B, 2> = x.flatten(1, 3);

        self.fc.forward(x)
    }
}
