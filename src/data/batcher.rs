// ============================================================
// Layer 4 - Dialog Batcher
// ============================================================
// Converts a DialogBatch (plain vectors) into tensors on the
// device the model lives on.
//
//   tokens        [N, H, L]  Int
//   floors        [N, H]     Int
//   target_floors [N]        Int
//   labels        [N]        Int
//
// The batch is already padded to fixed shapes, so batching is
// flatten → from_ints → reshape. Through burn's Batcher trait
// several batches of one source are stacked into one.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::data_source::DialogBatch;

#[derive(Debug, Clone)]
pub struct DialogTensors<B: Backend> {
    pub tokens:        Tensor<B, 3, Int>,
    pub floors:        Tensor<B, 2, Int>,
    pub target_floors: Tensor<B, 1, Int>,
    pub labels:        Tensor<B, 1, Int>,
}

/// Holds the target device so tensors land on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct DialogBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> DialogBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn tensors(&self, batch: &DialogBatch) -> DialogTensors<B> {
        let (n, h, l) = (batch.size, batch.history_len, batch.max_uttr_len);

        let tokens: Vec<i32> = batch.tokens.iter().map(|&id| id as i32).collect();
        let floors: Vec<i32> = batch.floors.iter().map(|&f| f as i32).collect();
        let target_floors: Vec<i32> = batch.target_floors.iter().map(|&f| f as i32).collect();
        let labels: Vec<i32> = batch.labels.iter().map(|&y| y as i32).collect();

        DialogTensors {
            tokens: Tensor::<B, 1, Int>::from_ints(tokens.as_slice(), &self.device)
                .reshape([n, h, l]),
            floors: Tensor::<B, 1, Int>::from_ints(floors.as_slice(), &self.device)
                .reshape([n, h]),
            target_floors: Tensor::<B, 1, Int>::from_ints(target_floors.as_slice(), &self.device),
            labels: Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
        }
    }
}

impl<B: Backend> Batcher<DialogBatch, DialogTensors<B>> for DialogBatcher<B> {
    fn batch(&self, items: Vec<DialogBatch>) -> DialogTensors<B> {
        let mut items = items.into_iter();
        let mut stacked = items.next().unwrap_or_default();
        for batch in items {
            stacked.append(batch);
        }
        self.tensors(&stacked)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn batch(labels: Vec<usize>) -> DialogBatch {
        let n = labels.len();
        DialogBatch {
            size:          n,
            history_len:   3,
            max_uttr_len:  4,
            tokens:        (0..(n * 12) as u32).collect(),
            floors:        vec![1; n * 3],
            target_floors: vec![1; n],
            labels,
        }
    }

    #[test]
    fn test_batcher_stacks_batches() {
        let batcher = DialogBatcher::<NdArray>::new(Default::default());
        let tensors = batcher.batch(vec![batch(vec![0, 1]), batch(vec![2])]);

        assert_eq!(tensors.tokens.dims(), [3, 3, 4]);
        assert_eq!(tensors.floors.dims(), [3, 3]);
        let labels: Vec<i64> = tensors.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_shapes() {
        let batch = DialogBatch {
            size:          2,
            history_len:   3,
            max_uttr_len:  4,
            tokens:        (0..24).collect(),
            floors:        vec![0, 1, 0, 1, 0, 1],
            target_floors: vec![0, 1],
            labels:        vec![5, 7],
        };
        let tensors = DialogBatcher::<NdArray>::new(Default::default()).tensors(&batch);

        assert_eq!(tensors.tokens.dims(), [2, 3, 4]);
        assert_eq!(tensors.floors.dims(), [2, 3]);
        assert_eq!(tensors.target_floors.dims(), [2]);
        let labels: Vec<i64> = tensors.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![5, 7]);
    }
}
