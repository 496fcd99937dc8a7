//! Per-epoch parameter snapshots.
//!
//! Each epoch writes `params_pass_<epoch>.tar` in the store directory, holding the
//! full-precision binary record of the classifier.

use crate::error::{Error, Result};
use crate::model::{Classifier, ClassifierConfig};
use burn::prelude::*;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use std::path::{Path, PathBuf};

pub type RecorderTy = BinBytesRecorder<FullPrecisionSettings>;

const PREFIX: &str = "params_pass_";
const EXTENSION: &str = "tar";

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("{PREFIX}{epoch}.{EXTENSION}"))
    }

    /// Writes the parameters of `model` for `epoch`, replacing any previous file.
    pub fn save<B: Backend>(&self, model: &Classifier<B>, epoch: usize) -> Result<PathBuf> {
        let path = self.path_for(epoch);
        let bytes = RecorderTy::default().record(model.clone().into_record(), ())?;
        std::fs::create_dir_all(&self.dir)
            .and_then(|()| std::fs::write(&path, bytes))
            .map_err(|source| Error::Checkpoint {
                path: path.clone(),
                source,
            })?;
        log::info!("saved checkpoint {path:?}");
        Ok(path)
    }

    pub fn load<B: Backend>(
        &self,
        config: &ClassifierConfig,
        epoch: usize,
        device: &B::Device,
    ) -> Result<Classifier<B>> {
        load_checkpoint(config, self.path_for(epoch), device)
    }

    /// Epochs with a checkpoint in the store, ascending.
    pub fn epochs(&self) -> Result<Vec<usize>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut epochs: Vec<usize> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| parse_epoch(&entry.file_name().to_string_lossy()))
            .collect();
        epochs.sort_unstable();
        Ok(epochs)
    }

    /// The most recent epoch with a checkpoint.
    pub fn latest(&self) -> Result<usize> {
        self.epochs()?
            .last()
            .copied()
            .ok_or_else(|| Error::CheckpointNotFound(self.dir.clone()))
    }
}

/// Rebuilds a classifier from `config` and loads the parameters stored at `path`.
pub fn load_checkpoint<B: Backend>(
    config: &ClassifierConfig,
    path: impl AsRef<Path>,
    device: &B::Device,
) -> Result<Classifier<B>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::CheckpointNotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })?;
    log::info!("loading checkpoint {path:?}");
    let record = RecorderTy::default().load(bytes, device)?;
    Ok(config.init::<B>(device).load_record(record))
}

fn parse_epoch(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(PREFIX)?
        .strip_suffix(EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}
