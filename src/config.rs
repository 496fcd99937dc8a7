use crate::error::Error;
use crate::model::ClassifierConfig;
use crate::optim::OptimizerConfig;
use burn::prelude::*;
use std::path::Path;

// `Result` stays unimported: the `Config` derive expands to the two-parameter std one.
pub const TRAINING_CONFIG_NAME: &str = "training_config.json";

#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub model: ClassifierConfig,
    pub optimizer: OptimizerConfig,
    #[config(default = 10)]
    pub num_epochs: usize,
    #[config(default = 128)]
    pub batch_size: usize,
    /// Batch size of the held-out evaluation pass.
    #[config(default = 128)]
    pub test_batch_size: usize,
    /// Items shuffled together before batching.
    #[config(default = 8192)]
    pub shuffle_buffer: usize,
    /// A train point is plotted every `plot_every` steps.
    #[config(default = 100)]
    pub plot_every: usize,
    /// A progress line is printed every `log_every` batches.
    #[config(default = 100)]
    pub log_every: usize,
    #[config(default = 0)]
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig::new(ClassifierConfig::new(), OptimizerConfig::default())
    }
}

pub fn save_training_config(path: &Path, training_config: &TrainingConfig) -> crate::Result<()> {
    log::info!("saving training config into {path:?}");
    training_config.save(path).map_err(Error::Io)
}

pub fn load_training_config(path: &Path) -> crate::Result<TrainingConfig> {
    log::info!("loading training config from {path:?}");
    TrainingConfig::load(path).map_err(|e| Error::Config(format!("{path:?}: {e}")))
}

/// Loads the config if the file exists.
pub fn try_load_training_config(path: &Path) -> crate::Result<Option<TrainingConfig>> {
    if std::fs::exists(path)? {
        load_training_config(path).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;
    use crate::optim::AdamOptimizerConfig;
    use temp_dir::TempDir;

    #[test]
    fn defaults_match_the_reference_run() {
        let config = TrainingConfig::default();
        assert_eq!(config.num_epochs, 10);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.shuffle_buffer, 8192);
        assert_eq!(config.model.kind, ModelKind::ConvNet);
        assert_eq!(config.optimizer.name(), "momentum");
    }

    #[test]
    fn json_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.child(TRAINING_CONFIG_NAME);
        let config = TrainingConfig::new(
            ClassifierConfig::new().with_kind(ModelKind::Mlp),
            OptimizerConfig::Adam(AdamOptimizerConfig::new().with_beta_2(0.999)),
        )
        .with_num_epochs(3);

        save_training_config(&path, &config).unwrap();
        let loaded = try_load_training_config(&path).unwrap().unwrap();

        assert_eq!(loaded.num_epochs, 3);
        assert_eq!(loaded.model.kind, ModelKind::Mlp);
        match loaded.optimizer {
            OptimizerConfig::Adam(adam) => assert_eq!(adam.beta_2, 0.999),
            other => panic!("unexpected optimizer {other:?}"),
        }
        assert!(try_load_training_config(&dir.child("missing.json")).unwrap().is_none());
    }
}
