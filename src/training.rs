use crate::checkpoint::CheckpointStore;
use crate::config::TrainingConfig;
use crate::data::{MnistBatch, MnistBatcher, Sample, ShuffleBuffer};
use crate::error::{Error, Result};
use crate::event::{BatchEvent, EpochEvent, EventHandler, Metrics, TrainingEvent};
use crate::model::Classifier;
use crate::optim::ModelOptimizer;
use crate::setup::TrainingSetup;
use burn::data::dataloader::{DataLoader, DataLoaderBuilder, Progress};
use burn::module::AutodiffModule;
use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};
use burn::optim::GradientsParams;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::train::ClassificationOutput;
use burn::train::metric::{AccuracyMetric, Adaptor, LossMetric, Metric, MetricMetadata, Numeric};
use burn_dataset::Dataset;
use std::sync::Arc;

type Dataloader<B> = Arc<dyn DataLoader<B, MnistBatch<B>> + 'static>;

/// Where a [`Trainer`] currently is in its run.
///
/// `Idle → RunningEpoch → Checkpointing → Evaluating → (RunningEpoch | Done)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Idle,
    RunningEpoch { epoch: usize },
    Checkpointing { epoch: usize },
    Evaluating { epoch: usize },
    Done,
}

/// Supervised training loop over a classifier.
///
/// Each epoch trains on the buffered-shuffled train set, writes a checkpoint and
/// evaluates the held-out set, reporting to an [`EventHandler`] along the way.
/// An error leaves the trainer in the state where it happened.
pub struct Trainer<AutoB: AutodiffBackend> {
    config: TrainingConfig,
    loss: CrossEntropyLoss<AutoB>,
    optimizer: Box<dyn ModelOptimizer<AutoB>>,
    checkpoints: CheckpointStore,
    state: TrainerState,
    step: usize,
}

impl<AutoB: AutodiffBackend> Trainer<AutoB> {
    pub fn new(
        config: TrainingConfig,
        loss: CrossEntropyLoss<AutoB>,
        optimizer: Box<dyn ModelOptimizer<AutoB>>,
        checkpoints: CheckpointStore,
    ) -> Self {
        Self {
            config,
            loss,
            optimizer,
            checkpoints,
            state: TrainerState::Idle,
            step: 0,
        }
    }

    /// Splits a [`TrainingSetup`] into its trainer and the model to train.
    pub fn from_setup(
        config: TrainingConfig,
        setup: TrainingSetup<AutoB>,
        checkpoints: CheckpointStore,
    ) -> (Self, Classifier<AutoB>) {
        let TrainingSetup {
            model,
            loss,
            optimizer,
            ..
        } = setup;
        (Self::new(config, loss, optimizer, checkpoints), model)
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    /// Optimizer steps taken so far.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Trains `model` for `num_epochs` epochs and returns it.
    pub fn fit<Train, Test>(
        &mut self,
        mut model: Classifier<AutoB>,
        train: Arc<Train>,
        test: Arc<Test>,
        handler: &mut impl EventHandler,
    ) -> Result<Classifier<AutoB>>
    where
        Train: Dataset<Sample> + 'static,
        Test: Dataset<Sample> + 'static,
    {
        log::info!(
            "training for {} epochs on {} samples, evaluating on {}",
            self.config.num_epochs,
            train.len(),
            test.len()
        );

        for epoch in 0..self.config.num_epochs {
            self.transition(TrainerState::RunningEpoch { epoch });
            let shuffled = ShuffleBuffer::new(
                Arc::clone(&train),
                self.config.shuffle_buffer,
                self.config.seed.wrapping_add(epoch as u64),
            );
            let dataloader: Dataloader<AutoB> = DataLoaderBuilder::new(MnistBatcher::default())
                .batch_size(self.config.batch_size)
                .build(shuffled);
            model = self.run_epoch(epoch, model, dataloader, handler)?;

            self.transition(TrainerState::Checkpointing { epoch });
            let checkpoint = self.checkpoints.save(&model, epoch)?;

            self.transition(TrainerState::Evaluating { epoch });
            let metrics = evaluate(
                &model.valid(),
                Arc::clone(&test),
                self.config.test_batch_size,
            )?;
            handler.handle(&TrainingEvent::Epoch(EpochEvent {
                epoch,
                step: self.step,
                metrics,
                checkpoint,
            }))?;
        }

        self.transition(TrainerState::Done);
        Ok(model)
    }

    fn run_epoch(
        &mut self,
        epoch: usize,
        mut model: Classifier<AutoB>,
        dataloader: Dataloader<AutoB>,
        handler: &mut impl EventHandler,
    ) -> Result<Classifier<AutoB>> {
        let num_items = dataloader.num_items();
        let mut metrics = PassMetrics::new(epoch + 1, self.config.num_epochs, num_items);
        for (batch_id, batch) in dataloader.iter().enumerate() {
            let output = model.forward_classification(batch.images, batch.targets, &self.loss);
            let batch_metrics = metrics.update(&output);

            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = self.optimizer.step(model, grads);

            handler.handle(&TrainingEvent::Batch(BatchEvent {
                epoch,
                batch: batch_id,
                step: self.step,
                metrics: batch_metrics,
            }))?;
            self.step += 1;
        }

        let averaged = metrics.averaged();
        log::info!(
            "epoch {epoch}: train cost {:.4}, error rate {:.4}",
            averaged.cost,
            averaged.error_rate
        );
        Ok(model)
    }

    fn transition(&mut self, next: TrainerState) {
        log::debug!("trainer {:?} -> {next:?}", self.state);
        self.state = next;
    }
}

/// Averaged cost and error rate of `model` over `dataset`, without gradients.
///
/// Both are weighted by sample, so a short last batch counts for its size.
pub fn evaluate<B: Backend, D>(
    model: &Classifier<B>,
    dataset: Arc<D>,
    batch_size: usize,
) -> Result<Metrics>
where
    D: Dataset<Sample> + 'static,
{
    if dataset.is_empty() {
        return Err(Error::Dataset("cannot evaluate on an empty dataset".into()));
    }
    let dataloader: Dataloader<B> = DataLoaderBuilder::new(MnistBatcher::default())
        .batch_size(batch_size)
        .build(dataset);

    let mut loss: Option<CrossEntropyLoss<B>> = None;
    let mut metrics = PassMetrics::new(1, 1, dataloader.num_items());
    for batch in dataloader.iter() {
        let loss =
            loss.get_or_insert_with(|| CrossEntropyLossConfig::new().init(&batch.images.device()));
        let output = model.forward_classification(batch.images, batch.targets, loss);
        metrics.update(&output);
    }

    Ok(metrics.averaged())
}

/// Loss and accuracy accumulated over the batches of one pass.
struct PassMetrics<B: Backend> {
    loss: LossMetric<B>,
    accuracy: AccuracyMetric<B>,
    meta: MetricMetadata,
}

impl<B: Backend> PassMetrics<B> {
    fn new(epoch: usize, epoch_total: usize, num_items: usize) -> Self {
        Self {
            loss: LossMetric::new(),
            accuracy: AccuracyMetric::new(),
            meta: MetricMetadata {
                progress: Progress::new(0, num_items),
                epoch,
                epoch_total,
                iteration: 0,
                lr: None,
            },
        }
    }

    /// Records a batch and returns the metrics of that batch alone.
    fn update(&mut self, output: &ClassificationOutput<B>) -> Metrics {
        let [batch_size, _classes] = output.output.dims();
        self.meta.iteration += 1;
        self.meta.progress.items_processed += batch_size;

        self.accuracy.update(&output.adapt(), &self.meta);
        self.loss.update(&output.adapt(), &self.meta);
        to_metrics(self.loss.value().current(), self.accuracy.value().current())
    }

    /// Metrics over every sample recorded so far.
    fn averaged(&self) -> Metrics {
        to_metrics(
            self.loss.running_value().current(),
            self.accuracy.running_value().current(),
        )
    }
}

/// `accuracy` is a percentage, as burn reports it.
fn to_metrics(cost: f64, accuracy: f64) -> Metrics {
    Metrics {
        cost,
        error_rate: 1.0 - accuracy / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FEATURES, NUM_CLASSES};
    use crate::model::{ClassifierConfig, ModelKind};
    use crate::optim::OptimizerConfig;
    use burn_dataset::InMemDataset;
    use temp_dir::TempDir;

    type TestBackend = burn::backend::NdArray<f32>;
    type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

    /// Digit `d` lights up pixel row `d`, so every class is linearly separable.
    fn striped_samples(n: usize) -> InMemDataset<Sample> {
        let samples = (0..n)
            .map(|i| {
                let label = (i % NUM_CLASSES) as u8;
                let mut image = vec![0.0; FEATURES];
                let row = usize::from(label) * 2;
                image[row * 28..(row + 1) * 28].fill(1.0);
                Sample::new(image, label).unwrap()
            })
            .collect();
        InMemDataset::new(samples)
    }

    fn config(kind: ModelKind, optimizer: OptimizerConfig) -> TrainingConfig {
        TrainingConfig::new(ClassifierConfig::new().with_kind(kind), optimizer)
    }

    fn trainer(
        config: TrainingConfig,
        dir: &TempDir,
    ) -> (Trainer<TestAutodiffBackend>, Classifier<TestAutodiffBackend>) {
        let setup = TrainingSetup::build(&config, &Default::default()).unwrap();
        Trainer::from_setup(config, setup, CheckpointStore::new(dir.path()))
    }

    #[test]
    fn emits_events_in_order_and_checkpoints_every_epoch() {
        let dir = TempDir::new().unwrap();
        let config = config(ModelKind::Linear, OptimizerConfig::default())
            .with_num_epochs(2)
            .with_batch_size(8)
            .with_test_batch_size(16);
        let (mut trainer, model) = trainer(config, &dir);
        assert_eq!(trainer.state(), TrainerState::Idle);

        let mut events = Vec::new();
        let mut handler = |event: &TrainingEvent| -> Result<()> {
            events.push(event.clone());
            Ok(())
        };
        trainer
            .fit(
                model,
                Arc::new(striped_samples(20)),
                Arc::new(striped_samples(10)),
                &mut handler,
            )
            .unwrap();

        assert_eq!(trainer.state(), TrainerState::Done);
        // 20 samples in batches of 8: 3 batches per epoch
        assert_eq!(trainer.step(), 6);
        assert_eq!(trainer.checkpoints().epochs().unwrap(), vec![0, 1]);

        let shape: Vec<String> = events
            .iter()
            .map(|event| match event {
                TrainingEvent::Batch(b) => format!("b{}.{}@{}", b.epoch, b.batch, b.step),
                TrainingEvent::Epoch(e) => format!("e{}@{}", e.epoch, e.step),
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                "b0.0@0", "b0.1@1", "b0.2@2", "e0@3", "b1.0@3", "b1.1@4", "b1.2@5", "e1@6"
            ]
        );
        for event in &events {
            if let TrainingEvent::Epoch(e) = event {
                assert!(e.checkpoint.exists());
                assert!((0.0..=1.0).contains(&e.metrics.error_rate));
                assert!(e.metrics.cost.is_finite());
            }
        }
    }

    #[test]
    fn learns_a_separable_problem() {
        let dir = TempDir::new().unwrap();
        let adam = OptimizerConfig::from_name("adam").unwrap();
        let config = config(ModelKind::Linear, adam)
            .with_num_epochs(5)
            .with_batch_size(10);
        let (mut trainer, model) = trainer(config, &dir);

        let data = Arc::new(striped_samples(100));
        let before = evaluate(&model.valid(), Arc::clone(&data), 32).unwrap();
        let model = trainer
            .fit(model, Arc::clone(&data), Arc::clone(&data), &mut |_: &TrainingEvent| -> Result<()> {
                Ok(())
            })
            .unwrap();
        let after = evaluate(&model.valid(), data, 32).unwrap();

        assert!(after.cost < before.cost, "{after:?} vs {before:?}");
    }

    #[test]
    fn handler_errors_abort_the_run() {
        let dir = TempDir::new().unwrap();
        let config = config(ModelKind::Mlp, OptimizerConfig::default()).with_batch_size(4);
        let (mut trainer, model) = trainer(config, &dir);

        let result = trainer.fit(
            model,
            Arc::new(striped_samples(8)),
            Arc::new(striped_samples(4)),
            &mut |_: &TrainingEvent| -> Result<()> { Err(Error::Dataset("stop".into())) },
        );

        assert!(matches!(result, Err(Error::Dataset(_))));
        assert_eq!(trainer.state(), TrainerState::RunningEpoch { epoch: 0 });
        assert!(trainer.checkpoints().epochs().unwrap().is_empty());
    }

    #[test]
    fn evaluation_weights_by_sample() {
        let device = Default::default();
        let model: Classifier<TestBackend> = ClassifierConfig::new()
            .with_kind(ModelKind::Linear)
            .init(&device);
        let data = Arc::new(striped_samples(10));

        let whole = evaluate(&model, Arc::clone(&data), 10).unwrap();
        let uneven = evaluate(&model, Arc::clone(&data), 3).unwrap();
        assert!((whole.cost - uneven.cost).abs() < 1e-5);
        assert!((whole.error_rate - uneven.error_rate).abs() < 1e-9);

        let empty = Arc::new(InMemDataset::<Sample>::new(Vec::new()));
        assert!(matches!(
            evaluate(&model, empty, 10),
            Err(Error::Dataset(_))
        ));
    }

    #[test]
    fn pass_metrics_weight_batches_by_size() {
        let device = Default::default();
        let output = |logits: Vec<[f32; NUM_CLASSES]>, targets: Vec<i64>, loss: f32| {
            let size = targets.len();
            let flat: Vec<f32> = logits.concat();
            ClassificationOutput::<TestBackend> {
                loss: Tensor::from_floats([loss], &device),
                output: Tensor::<TestBackend, 1>::from_floats(flat.as_slice(), &device)
                    .reshape([size, NUM_CLASSES]),
                targets: Tensor::from_ints(targets.as_slice(), &device),
            }
        };
        let one_hot = |class: usize| {
            let mut logits = [0.0; NUM_CLASSES];
            logits[class] = 1.0;
            logits
        };

        let mut metrics = PassMetrics::<TestBackend>::new(1, 1, 4);
        // two of three right
        let first = metrics.update(&output(
            vec![one_hot(0), one_hot(1), one_hot(2)],
            vec![0, 1, 5],
            0.3,
        ));
        assert!((first.cost - 0.3).abs() < 1e-6);
        assert!((first.error_rate - 1.0 / 3.0).abs() < 1e-6);

        let second = metrics.update(&output(vec![one_hot(4)], vec![4], 0.7));
        assert!(second.error_rate.abs() < 1e-6);

        let averaged = metrics.averaged();
        assert!((averaged.cost - 0.4).abs() < 1e-6, "{averaged:?}");
        assert!((averaged.error_rate - 0.25).abs() < 1e-6, "{averaged:?}");
    }
}
