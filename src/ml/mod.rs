// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model code and the training
// loop that drives it.
//
//   encoders.rs    - RNN stack, utterance encoder, floor encoder
//   hre.rs         - hierarchical recurrent encoder (+ sep variant)
//   transformer.rs - self-attention classifier over the window
//   learner.rs     - train/eval step + weights for one model
//   scheduler.rs   - reduce-on-plateau learning rate
//   trainer.rs     - the epoch / step / validation state machine
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

use burn::prelude::*;

use crate::data::batcher::DialogTensors;

/// Shared RNN and embedding blocks
pub mod encoders;

/// HRE and HRE with a separate target-utterance encoder
pub mod hre;

/// Transformer encoder classifier
pub mod transformer;

/// Global gradient norm clipping
pub mod grad_clip;

/// Step functions and weight persistence
pub mod learner;

/// Learning-rate decay on a validation plateau
pub mod scheduler;

/// Training loop
pub mod trainer;

/// Any model that maps a batch of dialog windows to label logits.
pub trait DialogActClassifier<B: Backend>: Module<B> {
    /// → [batch, n_labels]
    fn logits(&self, batch: &DialogTensors<B>) -> Tensor<B, 2>;
}
