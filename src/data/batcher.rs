use super::{FEATURES, Sample};
use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

#[derive(Clone, Default)]
pub struct MnistBatcher {}

#[derive(Clone, Debug)]
pub struct MnistBatch<B: Backend> {
    /// Brightness in between 0.0 and 1.0.
    ///
    /// # Shape
    /// [batch_size, WIDTH * HEIGHT]
    pub images: Tensor<B, 2>,
    /// # Shape
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, Sample, MnistBatch<B>> for MnistBatcher {
    fn batch(&self, items: Vec<Sample>, device: &B::Device) -> MnistBatch<B> {
        let batch_size = items.len();
        let (pixels, labels): (Vec<Vec<f32>>, Vec<i64>) = items
            .into_iter()
            .map(|item| (item.image().to_vec(), i64::from(item.label())))
            .unzip();

        let pixels: Vec<f32> = pixels.into_iter().flatten().collect();
        let images = Tensor::<B, 2>::from_data(
            TensorData::new(pixels, [batch_size, FEATURES]).convert::<B::FloatElem>(),
            device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]).convert::<B::IntElem>(),
            device,
        );

        MnistBatch { images, targets }
    }
}
