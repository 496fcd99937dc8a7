use burn_dataset::Dataset;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::marker::PhantomData;
use std::sync::Arc;

/// Buffered shuffle over a dataset.
///
/// Items are read in consecutive windows of `buffer_size` and each window is
/// shuffled on its own, so an item never travels further than one buffer from
/// its original position.
///
/// Example: len = 6, buffer_size = 3:
/// (0, 1, 2) → (2, 0, 1), (3, 4, 5) → (4, 5, 3)
pub struct ShuffleBuffer<D, I> {
    dataset: Arc<D>,
    indices: Vec<usize>,
    input: PhantomData<I>,
}

impl<D, I> ShuffleBuffer<D, I>
where
    D: Dataset<I>,
{
    pub fn new(dataset: Arc<D>, buffer_size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..dataset.len()).collect();
        for window in indices.chunks_mut(buffer_size.max(1)) {
            window.shuffle(&mut rng);
        }
        Self {
            dataset,
            indices,
            input: PhantomData,
        }
    }
}

impl<D, I> Dataset<I> for ShuffleBuffer<D, I>
where
    D: Dataset<I>,
    I: Send + Sync,
{
    fn get(&self, index: usize) -> Option<I> {
        let index = *self.indices.get(index)?;
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}
