//! Assembles everything a training run needs from a [`TrainingConfig`].

use crate::config::TrainingConfig;
use crate::data::{FEATURES, NUM_CLASSES};
use crate::error::{Error, Result};
use crate::model::Classifier;
use crate::optim::ModelOptimizer;
use burn::module::AutodiffModule;
use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

/// Dense input vector of flattened pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub features: usize,
}

impl Default for InputSpec {
    fn default() -> Self {
        Self { features: FEATURES }
    }
}

/// Integer class label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelSpec {
    pub num_classes: usize,
}

impl Default for LabelSpec {
    fn default() -> Self {
        Self {
            num_classes: NUM_CLASSES,
        }
    }
}

pub struct TrainingSetup<AutoB: AutodiffBackend> {
    pub input: InputSpec,
    pub label: LabelSpec,
    pub model: Classifier<AutoB>,
    pub loss: CrossEntropyLoss<AutoB>,
    pub optimizer: Box<dyn ModelOptimizer<AutoB>>,
    pub num_params: usize,
}

impl<AutoB: AutodiffBackend> TrainingSetup<AutoB> {
    /// Builds the model, loss and optimizer, checking that the model agrees with
    /// the input and label layout before any training starts.
    pub fn build(config: &TrainingConfig, device: &AutoB::Device) -> Result<Self> {
        let input = InputSpec::default();
        let label = LabelSpec::default();

        if config.model.input_size != input.features {
            return Err(Error::ShapeMismatch {
                context: "model input",
                expected: vec![input.features],
                got: vec![config.model.input_size],
            });
        }
        if config.model.num_classes != label.num_classes {
            return Err(Error::ShapeMismatch {
                context: "model output",
                expected: vec![label.num_classes],
                got: vec![config.model.num_classes],
            });
        }

        let model: Classifier<AutoB> = config.model.init(device);
        probe(&model.valid(), input, label, device)?;

        let num_params = model.num_params();
        log::info!(
            "{} model with {num_params} parameters, {} optimizer (learning rate {})",
            config.model.kind.name(),
            config.optimizer.name(),
            config.optimizer.learning_rate(),
        );

        Ok(Self {
            input,
            label,
            model,
            loss: CrossEntropyLossConfig::new().init(device),
            optimizer: config.optimizer.init(),
            num_params,
        })
    }
}

/// Runs one zero image through `model` and checks the output layout.
fn probe<B: Backend>(
    model: &Classifier<B>,
    input: InputSpec,
    label: LabelSpec,
    device: &B::Device,
) -> Result<()> {
    let output = model.forward(Tensor::zeros([1, input.features], device));
    let expected = [1, label.num_classes];
    if output.dims() != expected {
        return Err(Error::ShapeMismatch {
            context: "probe forward",
            expected: expected.to_vec(),
            got: output.dims().to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassifierConfig, ModelKind};
    use crate::optim::OptimizerConfig;

    type TestAutodiffBackend = burn::backend::Autodiff<burn::backend::NdArray<f32>>;

    fn config(model: ClassifierConfig) -> TrainingConfig {
        TrainingConfig::new(model, OptimizerConfig::default())
    }

    #[test]
    fn builds_every_model_kind() {
        let device = Default::default();
        for kind in ModelKind::ALL {
            let setup = TrainingSetup::<TestAutodiffBackend>::build(
                &config(ClassifierConfig::new().with_kind(kind)),
                &device,
            )
            .unwrap();
            assert_eq!(setup.model.kind(), kind);
            assert_eq!(setup.input.features, FEATURES);
            assert_eq!(setup.label.num_classes, NUM_CLASSES);
            assert!(setup.num_params > 0);
        }
        let linear = TrainingSetup::<TestAutodiffBackend>::build(
            &config(ClassifierConfig::new().with_kind(ModelKind::Linear)),
            &device,
        )
        .unwrap();
        assert_eq!(linear.num_params, FEATURES * NUM_CLASSES + NUM_CLASSES);
    }

    #[test]
    fn rejects_mismatching_layouts() {
        let device = Default::default();
        let wrong_input = config(
            ClassifierConfig::new()
                .with_kind(ModelKind::Mlp)
                .with_input_size(100),
        );
        assert!(matches!(
            TrainingSetup::<TestAutodiffBackend>::build(&wrong_input, &device),
            Err(Error::ShapeMismatch {
                context: "model input",
                ..
            })
        ));

        let wrong_classes = config(ClassifierConfig::new().with_num_classes(26));
        assert!(matches!(
            TrainingSetup::<TestAutodiffBackend>::build(&wrong_classes, &device),
            Err(Error::ShapeMismatch {
                context: "model output",
                ..
            })
        ));
    }

    #[test]
    fn probe_reports_the_actual_output() {
        type TestBackend = burn::backend::NdArray<f32>;
        let device = Default::default();
        let model: Classifier<TestBackend> = ClassifierConfig::new()
            .with_kind(ModelKind::Linear)
            .with_num_classes(3)
            .init(&device);

        let err = probe(&model, InputSpec::default(), LabelSpec::default(), &device).unwrap_err();
        match err {
            Error::ShapeMismatch { expected, got, .. } => {
                assert_eq!(expected, vec![1, NUM_CLASSES]);
                assert_eq!(got, vec![1, 3]);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
