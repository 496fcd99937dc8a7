use crate::model::Classifier;
use burn::optim::{
    AdamConfig, GradientsParams, Optimizer, SgdConfig, decay::WeightDecayConfig,
    momentum::MomentumConfig,
};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

/// Applies one parameter update to a [`Classifier`].
///
/// Object-safe view over burn's optimizers so the selected update rule can be
/// chosen from configuration at runtime.
pub trait ModelOptimizer<AutoB: AutodiffBackend>: Send {
    fn learning_rate(&self) -> f64;

    fn step(&mut self, model: Classifier<AutoB>, grads: GradientsParams) -> Classifier<AutoB>;
}

struct Stepper<O> {
    optim: O,
    learning_rate: f64,
}

impl<AutoB, O> ModelOptimizer<AutoB> for Stepper<O>
where
    AutoB: AutodiffBackend,
    O: Optimizer<Classifier<AutoB>, AutoB>,
{
    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn step(&mut self, model: Classifier<AutoB>, grads: GradientsParams) -> Classifier<AutoB> {
        self.optim.step(self.learning_rate, model, grads)
    }
}

/// Stochastic gradient descent with momentum and L2 regularization.
///
/// `velocity = momentum * velocity + (grad + l2_rate * weight)`,
/// `weight -= learning_rate * velocity`.
#[derive(Config, Debug)]
pub struct MomentumOptimizerConfig {
    #[config(default = "0.1 / 128.0")]
    pub learning_rate: f64,
    #[config(default = 0.95)]
    pub momentum: f64,
    #[config(default = "0.0005 * 128.0")]
    pub l2_rate: f64,
}

impl MomentumOptimizerConfig {
    pub fn init<AutoB: AutodiffBackend>(&self) -> Box<dyn ModelOptimizer<AutoB>> {
        let optim = SgdConfig::new()
            .with_momentum(Some(
                MomentumConfig::new()
                    .with_momentum(self.momentum as _)
                    .with_dampening(0.0),
            ))
            .with_weight_decay(Some(WeightDecayConfig::new(self.l2_rate as _)))
            .init::<AutoB, Classifier<AutoB>>();
        Box::new(Stepper {
            optim,
            learning_rate: self.learning_rate,
        })
    }
}

/// Adaptive moment estimation.
#[derive(Config, Debug)]
pub struct AdamOptimizerConfig {
    #[config(default = 1e-3)]
    pub learning_rate: f64,
    #[config(default = 0.9)]
    pub beta_1: f64,
    #[config(default = 0.99)]
    pub beta_2: f64,
    #[config(default = 1e-6)]
    pub epsilon: f64,
}

impl AdamOptimizerConfig {
    pub fn init<AutoB: AutodiffBackend>(&self) -> Box<dyn ModelOptimizer<AutoB>> {
        let optim = AdamConfig::new()
            .with_beta_1(self.beta_1 as _)
            .with_beta_2(self.beta_2 as _)
            .with_epsilon(self.epsilon as _)
            .init::<AutoB, Classifier<AutoB>>();
        Box::new(Stepper {
            optim,
            learning_rate: self.learning_rate,
        })
    }
}

/// The update rule used for training; exactly one is active per run.
#[derive(Config, Debug)]
pub enum OptimizerConfig {
    Momentum(MomentumOptimizerConfig),
    Adam(AdamOptimizerConfig),
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Momentum(MomentumOptimizerConfig::new())
    }
}

impl OptimizerConfig {
    /// Parses `momentum` or `adam`, with default hyper-parameters.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "momentum" | "sgd" => Some(OptimizerConfig::Momentum(MomentumOptimizerConfig::new())),
            "adam" => Some(OptimizerConfig::Adam(AdamOptimizerConfig::new())),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OptimizerConfig::Momentum(_) => "momentum",
            OptimizerConfig::Adam(_) => "adam",
        }
    }

    pub fn learning_rate(&self) -> f64 {
        match self {
            OptimizerConfig::Momentum(config) => config.learning_rate,
            OptimizerConfig::Adam(config) => config.learning_rate,
        }
    }

    pub fn init<AutoB: AutodiffBackend>(&self) -> Box<dyn ModelOptimizer<AutoB>> {
        match self {
            OptimizerConfig::Momentum(config) => config.init(),
            OptimizerConfig::Adam(config) => config.init(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FEATURES;
    use crate::model::{ClassifierConfig, ModelKind};
    use burn::module::AutodiffModule;
    use burn::nn::loss::CrossEntropyLossConfig;

    type TestAutodiffBackend = burn::backend::Autodiff<burn::backend::NdArray<f32>>;

    fn one_step(config: &OptimizerConfig) -> (Vec<f32>, Vec<f32>) {
        let device = Default::default();
        let model: Classifier<TestAutodiffBackend> = ClassifierConfig::new()
            .with_kind(ModelKind::Linear)
            .init(&device);
        let before = weights(&model);

        let loss = CrossEntropyLossConfig::new().init(&device);
        let images = Tensor::<TestAutodiffBackend, 2>::ones([2, FEATURES], &device);
        let targets = Tensor::<TestAutodiffBackend, 1, Int>::from_ints([0, 1], &device);
        let output = model.forward_classification(images, targets, &loss);
        let grads = GradientsParams::from_grads(output.loss.backward(), &model);

        let mut optim = config.init::<TestAutodiffBackend>();
        let model = optim.step(model, grads);
        (before, weights(&model))
    }

    fn weights(model: &Classifier<TestAutodiffBackend>) -> Vec<f32> {
        match model.valid() {
            Classifier::Linear(linear) => linear.fc.weight.val().into_data().to_vec().unwrap(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn momentum_moves_the_weights() {
        let (before, after) = one_step(&OptimizerConfig::default());
        assert_ne!(before, after);
    }

    #[test]
    fn adam_moves_the_weights() {
        let (before, after) = one_step(&OptimizerConfig::from_name("adam").unwrap());
        assert_ne!(before, after);
    }

    #[test]
    fn names_round_trip() {
        for name in ["momentum", "adam"] {
            assert_eq!(OptimizerConfig::from_name(name).unwrap().name(), name);
        }
        assert!(OptimizerConfig::from_name("rmsprop").is_none());
        assert!((OptimizerConfig::default().learning_rate() - 0.1 / 128.0).abs() < 1e-12);
    }
}
