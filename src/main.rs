mod cli;

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn_digits::backend::{BackendKind, CpuAutoBackend, CpuBackend, MainDevice, select_backend};
use burn_digits::checkpoint::CheckpointStore;
use burn_digits::config::{TrainingConfig, save_training_config};
use burn_digits::data::MnistDataset;
use burn_digits::inference::Inferencer;
use burn_digits::metrics::MetricsRecorder;
use burn_digits::model::Classifier;
use burn_digits::setup::TrainingSetup;
use burn_digits::training::Trainer;
use burn_digits::{Error, Result};
use cli::AppArgs;
use std::sync::Arc;

fn main() -> Result<()> {
    let env = env_logger::Env::default().default_filter_or("burn_digits=info");
    env_logger::Builder::from_env(env).init();

    let args = AppArgs::parse().map_err(|e| Error::Config(e.to_string()))?;
    match select_backend() {
        BackendKind::Cpu => launch::<CpuBackend, CpuAutoBackend>(&args),
        BackendKind::Gpu => launch_gpu(&args),
    }
}

#[cfg(feature = "wgpu")]
fn launch_gpu(args: &AppArgs) -> Result<()> {
    use burn_digits::backend::{GpuAutoBackend, GpuBackend};
    launch::<GpuBackend, GpuAutoBackend>(args)
}

#[cfg(not(feature = "wgpu"))]
fn launch_gpu(args: &AppArgs) -> Result<()> {
    launch::<CpuBackend, CpuAutoBackend>(args)
}

fn launch<B, AutoB>(args: &AppArgs) -> Result<()>
where
    B: Backend + MainDevice,
    AutoB: AutodiffBackend<InnerBackend = B> + MainDevice,
{
    std::fs::create_dir_all(&args.artifacts_path)?;
    let config = args.load_training_config()?;

    let trained = if args.training {
        save_training_config(&args.training_config_path(), &config)?;
        Some(train::<AutoB>(&config, args)?)
    } else {
        None
    };

    if args.inference {
        let device = B::main_device();
        let inferencer = match trained {
            Some(model) => Inferencer::new(model.valid(), device),
            None => {
                let store = CheckpointStore::new(&args.artifacts_path);
                let epoch = match args.pass {
                    Some(epoch) => epoch,
                    None => store.latest()?,
                };
                Inferencer::from_checkpoint(&config.model, store.path_for(epoch), &device)?
            }
        };
        let image = args.image_path();
        let label = inferencer.predict_file(&image)?;
        println!("Label of image {} is: {label}", image.display());
    }
    Ok(())
}

fn train<AutoB: AutodiffBackend + MainDevice>(
    config: &TrainingConfig,
    args: &AppArgs,
) -> Result<Classifier<AutoB>> {
    let device = AutoB::main_device();
    let setup = TrainingSetup::<AutoB>::build(config, &device)?;
    let (mut trainer, model) = Trainer::from_setup(
        config.clone(),
        setup,
        CheckpointStore::new(&args.artifacts_path),
    );

    let train = Arc::new(MnistDataset::train()?);
    let test = Arc::new(MnistDataset::test()?);
    let mut recorder =
        MetricsRecorder::new(&args.artifacts_path, config.plot_every, config.log_every);

    println!("Starting training...");
    let model = trainer.fit(model, train, test, &mut recorder)?;

    if let Some(best) = recorder.best() {
        println!("Best pass is {}, testing Avgcost is {}", best.epoch, best.cost);
        println!("The classification accuracy is {:.2}%", best.accuracy());
    }
    Ok(model)
}
