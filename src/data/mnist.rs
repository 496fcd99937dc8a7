use super::{HEIGHT, NUM_CLASSES, Sample, WIDTH};
use crate::error::{Error, Result};
use burn_common::network::downloader::download_file_as_bytes;
use burn_dataset::{
    Dataset, InMemDataset,
    transform::{Mapper, MapperDataset},
};
use flate2::read::GzDecoder;
use num_traits::AsPrimitive;
use std::fs::{File, create_dir_all};
use std::io::Read;
use std::path::{Path, PathBuf};

// CVDF mirror of http://yann.lecun.com/exdb/mnist/
const URL: &str = "https://storage.googleapis.com/cvdf-datasets/mnist/";
const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    fn files(self) -> (&'static str, &'static str) {
        match self {
            Split::Train => (TRAIN_IMAGES, TRAIN_LABELS),
            Split::Test => (TEST_IMAGES, TEST_LABELS),
        }
    }
}

#[derive(Debug, Clone)]
struct MnistItemRaw {
    image_bytes: Vec<u8>,
    label: u8,
}

struct BytesToSample;

impl Mapper<MnistItemRaw, Sample> for BytesToSample {
    /// Scales each brightness from `[0, 255]` into `[0, 1]`.
    fn map(&self, item: &MnistItemRaw) -> Sample {
        debug_assert_eq!(item.image_bytes.len(), WIDTH * HEIGHT);

        let image: Vec<f32> = item
            .image_bytes
            .iter()
            .map(|brightness| {
                let brightness: f32 = (*brightness).as_();
                brightness / 255.0
            })
            .collect();

        Sample {
            image,
            label: item.label,
        }
    }
}

type MappedDataset = MapperDataset<InMemDataset<MnistItemRaw>, BytesToSample, MnistItemRaw>;

/// The MNIST dataset consists of 70,000 28x28 black-and-white images in 10 classes (one for each digits), with 7,000
/// images per class. There are 60,000 training images and 10,000 test images.
///
/// The data is downloaded from the web from the [CVDF mirror](https://github.com/cvdfoundation/mnist).
pub struct MnistDataset {
    dataset: MappedDataset,
}

impl Dataset<Sample> for MnistDataset {
    fn get(&self, index: usize) -> Option<Sample> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl MnistDataset {
    /// Downloads (when not cached) and loads the train split.
    pub fn train() -> Result<Self> {
        Self::new(Split::Train)
    }

    /// Downloads (when not cached) and loads the test split.
    pub fn test() -> Result<Self> {
        Self::new(Split::Test)
    }

    fn new(split: Split) -> Result<Self> {
        let root = Self::download(split)?;
        Self::from_dir(root, split)
    }

    /// Loads a split from already extracted IDX files.
    pub fn from_dir(root: impl AsRef<Path>, split: Split) -> Result<Self> {
        let (images_file, labels_file) = split.files();
        let images = read_images(&root.as_ref().join(images_file))?;
        let labels = read_labels(&root.as_ref().join(labels_file))?;
        if images.len() != labels.len() {
            return Err(Error::Dataset(format!(
                "{} images but {} labels in the {} split",
                images.len(),
                labels.len(),
                split.name()
            )));
        }

        let items: Vec<_> = images
            .into_iter()
            .zip(labels)
            .map(|(image_bytes, label)| MnistItemRaw { image_bytes, label })
            .collect();
        log::info!("loaded {} MNIST {} samples", items.len(), split.name());

        let dataset = InMemDataset::new(items);
        let dataset = MapperDataset::new(dataset, BytesToSample);

        Ok(Self { dataset })
    }

    /// Downloads the split files into the burn-dataset cache directory.
    fn download(split: Split) -> Result<PathBuf> {
        let cache_dir = dirs::home_dir()
            .ok_or_else(|| Error::Dataset("could not get the home directory".into()))?
            .join(".cache")
            .join("burn-dataset");
        let split_dir = cache_dir.join("mnist").join(split.name());

        if !split_dir.exists() {
            create_dir_all(&split_dir)?;
        }

        let (images_file, labels_file) = split.files();
        download_file(images_file, &split_dir)?;
        download_file(labels_file, &split_dir)?;

        Ok(split_dir)
    }
}

/// Downloads and un-gzips a file from the MNIST mirror, unless already present.
fn download_file(name: &str, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = dest_dir.join(name);

    if !file_name.exists() {
        log::info!("downloading {name} into {dest_dir:?}");
        let bytes = download_file_as_bytes(&format!("{URL}{name}.gz"), name);
        store_gunzipped(&bytes, &file_name)?;
    }

    Ok(file_name)
}

/// Un-gzips `bytes` into `file_name`, which only appears once fully written.
fn store_gunzipped(bytes: &[u8], file_name: &Path) -> Result<()> {
    let mut decoded = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut decoded)
        .map_err(|e| Error::Dataset(format!("failed to un-gzip {file_name:?}: {e}")))?;

    let partial = file_name.with_extension("part");
    std::fs::write(&partial, decoded)?;
    std::fs::rename(&partial, file_name)?;
    Ok(())
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let word = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
}

fn read_idx(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| Error::Dataset(format!("failed to read {path:?}: {e}")))?;
    Ok(bytes)
}

/// Reads an IDX3 image file: 16-byte header, then one byte per pixel.
fn read_images(path: &Path) -> Result<Vec<Vec<u8>>> {
    let bytes = read_idx(path)?;
    let header = |offset| {
        read_u32(&bytes, offset)
            .ok_or_else(|| Error::Dataset(format!("truncated image header in {path:?}")))
    };
    let magic = header(0)?;
    if magic != IMAGES_MAGIC {
        return Err(Error::Dataset(format!(
            "bad image magic number {magic} in {path:?}"
        )));
    }
    let size = header(4)? as usize;
    let rows = header(8)? as usize;
    let cols = header(12)? as usize;
    if (rows, cols) != (HEIGHT, WIDTH) {
        return Err(Error::Dataset(format!(
            "expected {HEIGHT}x{WIDTH} images, got {rows}x{cols} in {path:?}"
        )));
    }

    let pixels = bytes.get(16..16 + size * WIDTH * HEIGHT).ok_or_else(|| {
        Error::Dataset(format!("expected {size} images in {path:?}"))
    })?;

    Ok(pixels
        .chunks(WIDTH * HEIGHT)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// Reads an IDX1 label file: 8-byte header, then one byte per label.
fn read_labels(path: &Path) -> Result<Vec<u8>> {
    let bytes = read_idx(path)?;
    let magic = read_u32(&bytes, 0)
        .ok_or_else(|| Error::Dataset(format!("truncated label header in {path:?}")))?;
    if magic != LABELS_MAGIC {
        return Err(Error::Dataset(format!(
            "bad label magic number {magic} in {path:?}"
        )));
    }
    let size = read_u32(&bytes, 4)
        .ok_or_else(|| Error::Dataset(format!("truncated label header in {path:?}")))?
        as usize;

    let labels = bytes
        .get(8..8 + size)
        .ok_or_else(|| Error::Dataset(format!("expected {size} labels in {path:?}")))?;
    if let Some(label) = labels.iter().find(|l| usize::from(**l) >= NUM_CLASSES) {
        return Err(Error::Dataset(format!("label {label} is not a digit")));
    }

    Ok(labels.to_vec())
}
