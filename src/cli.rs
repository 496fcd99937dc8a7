use burn_digits::config::{TRAINING_CONFIG_NAME, TrainingConfig, try_load_training_config};
use burn_digits::model::ModelKind;
use burn_digits::optim::OptimizerConfig;
use burn_digits::{Error, Result};
use std::path::PathBuf;

pub const HELP: &str = "\
Burn Digits

Trains a handwritten digit classifier on MNIST and/or predicts the digit of an image.
Checkpoints, plots and the training configuration are kept in an artifacts directory.

USAGE:
    burn-digits [OPTIONS]

When neither --training nor --inference is given, both run: training first, then inference
with the freshly trained model.

BEHAVIOR OVERVIEW
- The training configuration is read from --training-config if given, otherwise from
  <artifacts>/training_config.json if present, otherwise the defaults are used.
- --model, --optimizer and --epochs override the corresponding configuration entries.
- Training saves the configuration to <artifacts>/training_config.json, writes
  <artifacts>/params_pass_<N>.tar after every pass and keeps <artifacts>/train_test_cost.png
  and <artifacts>/train_test_error_rate.png up to date.
- Inference without training loads the checkpoint of --pass, or the latest one.
- Set WITH_GPU to anything but 0 to use the GPU (requires the `wgpu` feature).

FLAGS:
    -h, --help                  Show this help message and exit
    -t, --training              Run training
    -i, --inference             Run inference

OPTIONS:
    -a, --artifacts-path <PATH> Directory for checkpoints, plots and configuration [default: .]
    -c, --training-config <PATH>
                                Load the training configuration from this file
    -m, --model <NAME>          Model to train: linear, mlp or conv (ignored without training)
    -o, --optimizer <NAME>      Update rule: momentum or adam
    -e, --epochs <N>            Number of training passes
    -p, --pass <N>              Checkpoint used by inference-only runs [default: latest]
        --image <PATH>          Image to classify [default: image/infer_3.png]
";

#[derive(Debug)]
pub struct AppArgs {
    pub training: bool,
    pub inference: bool,
    pub artifacts_path: PathBuf,
    pub training_config: Option<PathBuf>,
    pub model: Option<ModelKind>,
    pub optimizer: Option<OptimizerConfig>,
    pub epochs: Option<usize>,
    pub pass: Option<usize>,
    pub image: Option<PathBuf>,
}

impl AppArgs {
    pub fn parse() -> std::result::Result<Self, pico_args::Error> {
        Self::from_args(pico_args::Arguments::from_env())
    }

    pub fn from_args(
        mut pargs: pico_args::Arguments,
    ) -> std::result::Result<Self, pico_args::Error> {
        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            println!("{HELP}");
            std::process::exit(0);
        }

        let mut args = AppArgs {
            artifacts_path: pargs
                .opt_value_from_os_str(["-a", "--artifacts-path"], parse_path)?
                .unwrap_or_else(|| PathBuf::from(".")),
            training_config: pargs
                .opt_value_from_os_str(["-c", "--training-config"], parse_path)?,
            model: pargs.opt_value_from_str(["-m", "--model"])?,
            optimizer: pargs.opt_value_from_fn(["-o", "--optimizer"], parse_optimizer)?,
            epochs: pargs.opt_value_from_str(["-e", "--epochs"])?,
            pass: pargs.opt_value_from_str(["-p", "--pass"])?,
            image: pargs.opt_value_from_os_str("--image", parse_path)?,
            // must parse flags after values
            training: pargs.contains(["-t", "--training"]),
            inference: pargs.contains(["-i", "--inference"]),
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(pico_args::Error::ArgumentParsingFailed {
                cause: format!("unused arguments: {remaining:?}"),
            });
        }

        if !args.training && !args.inference {
            args.training = true;
            args.inference = true;
        }
        Ok(args)
    }

    pub fn training_config_path(&self) -> PathBuf {
        self.artifacts_path.join(TRAINING_CONFIG_NAME)
    }

    /// Explicit file, then the artifacts directory, then the defaults; the
    /// command-line overrides apply last.
    pub fn load_training_config(&self) -> Result<TrainingConfig> {
        let loaded = match &self.training_config {
            Some(path) => Some(
                try_load_training_config(path)?
                    .ok_or_else(|| Error::Config(format!("missing training config {path:?}")))?,
            ),
            None => try_load_training_config(&self.training_config_path())?,
        };
        let mut config = loaded.unwrap_or_else(|| {
            log::info!("using the default training config");
            TrainingConfig::default()
        });

        // checkpoints only load into the model kind that wrote them
        match self.model {
            Some(kind) if self.training => config.model.kind = kind,
            Some(kind) => log::warn!(
                "ignoring --model {kind:?} without training, using the saved {:?}",
                config.model.kind
            ),
            None => {}
        }
        if let Some(optimizer) = &self.optimizer {
            config.optimizer = optimizer.clone();
        }
        if let Some(epochs) = self.epochs {
            config.num_epochs = epochs;
        }
        Ok(config)
    }

    pub fn image_path(&self) -> PathBuf {
        self.image.clone().unwrap_or_else(|| {
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("image").join("infer_3.png")
        })
    }
}

fn parse_path(s: &std::ffi::OsStr) -> std::result::Result<PathBuf, &'static str> {
    Ok(s.into())
}

fn parse_optimizer(s: &str) -> std::result::Result<OptimizerConfig, String> {
    OptimizerConfig::from_name(s)
        .ok_or_else(|| format!("unknown optimizer {s:?}, expected momentum or adam"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn parse(args: &[&str]) -> AppArgs {
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        AppArgs::from_args(pico_args::Arguments::from_vec(args)).unwrap()
    }

    #[test]
    fn no_mode_flag_runs_both() {
        let args = parse(&[]);
        assert!(args.training && args.inference);
        assert_eq!(args.artifacts_path, PathBuf::from("."));
        assert!(args.image_path().ends_with("image/infer_3.png"));
    }

    #[test]
    fn overrides_apply_on_top_of_the_config() {
        let args = parse(&[
            "-t",
            "-m",
            "mlp",
            "-o",
            "adam",
            "-e",
            "3",
            "-a",
            "/nonexistent-dir",
        ]);
        assert!(args.training && !args.inference);

        let config = args.load_training_config().unwrap();
        assert_eq!(config.model.kind, ModelKind::Mlp);
        assert_eq!(config.optimizer.name(), "adam");
        assert_eq!(config.num_epochs, 3);
        assert_eq!(config.batch_size, 128);
    }

    #[test]
    fn inference_only_keeps_the_saved_model_kind() {
        let dir = temp_dir::TempDir::new().unwrap();
        let saved = TrainingConfig::default();
        burn_digits::config::save_training_config(&dir.child(TRAINING_CONFIG_NAME), &saved)
            .unwrap();

        let artifacts = dir.path().to_str().unwrap();
        let args = parse(&["-i", "-m", "linear", "-a", artifacts]);
        let config = args.load_training_config().unwrap();
        assert_eq!(config.model.kind, saved.model.kind);
    }

    #[test]
    fn rejects_unknown_names_and_arguments() {
        let from = |args: &[&str]| {
            let args: Vec<OsString> = args.iter().map(OsString::from).collect();
            AppArgs::from_args(pico_args::Arguments::from_vec(args))
        };
        assert!(from(&["-o", "rmsprop"]).is_err());
        assert!(from(&["-m", "resnet"]).is_err());
        assert!(from(&["--frobnicate"]).is_err());
    }
}
