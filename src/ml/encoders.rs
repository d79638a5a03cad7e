// ============================================================
// Layer 5 - Shared Encoders
// ============================================================
// Building blocks shared by the hierarchical models:
//
//   RnnStack          - n stacked GRU or LSTM layers, dropout between
//   UtteranceEncoder  - word embedding → RnnStack → masked mean pool
//   FloorEncoder      - speaker embedding per history utterance
//
// All recurrent layers are batch-first: [batch, seq, features].

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        lstm::{Lstm, LstmConfig},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig,
    },
    prelude::*,
};

use crate::domain::selectors::{FloorEncoding, RnnType};

// ─── RnnStack ─────────────────────────────────────────────────────────────────

/// Only one of `grus` / `lstms` is populated.
#[derive(Module, Debug)]
pub struct RnnStack<B: Backend> {
    pub grus:    Vec<Gru<B>>,
    pub lstms:   Vec<Lstm<B>>,
    pub dropout: Dropout,
}

impl<B: Backend> RnnStack<B> {
    pub fn new(
        rnn_type: RnnType,
        d_input:  usize,
        d_hidden: usize,
        n_layers: usize,
        dropout:  f64,
        device:   &B::Device,
    ) -> Self {
        let n_layers = n_layers.max(1);
        let input_dim = |layer: usize| if layer == 0 { d_input } else { d_hidden };

        let (grus, lstms) = match rnn_type {
            RnnType::Gru => (
                (0..n_layers)
                    .map(|i| GruConfig::new(input_dim(i), d_hidden, true).init(device))
                    .collect(),
                Vec::new(),
            ),
            RnnType::Lstm => (
                Vec::new(),
                (0..n_layers)
                    .map(|i| LstmConfig::new(input_dim(i), d_hidden, true).init(device))
                    .collect(),
            ),
        };

        Self { grus, lstms, dropout: DropoutConfig::new(dropout).init() }
    }

    /// x: [batch, seq, d_input] → [batch, seq, d_hidden]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut x = x;
        for (i, gru) in self.grus.iter().enumerate() {
            if i > 0 {
                x = self.dropout.forward(x);
            }
            x = gru.forward(x, None);
        }
        for (i, lstm) in self.lstms.iter().enumerate() {
            if i > 0 {
                x = self.dropout.forward(x);
            }
            let (output, _state) = lstm.forward(x, None);
            x = output;
        }
        x
    }
}

/// Mean over the sequence axis counting only positions where `mask` is 1.
/// Rows with an empty mask pool to zeros.
///
/// x: [batch, seq, d], mask: [batch, seq] → [batch, d]
pub fn masked_mean<B: Backend>(x: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, _seq, d] = x.dims();
    let mask = mask.unsqueeze_dim::<3>(2);
    let summed = (x * mask.clone()).sum_dim(1);
    let counts = mask.sum_dim(1).clamp_min(1.0);
    (summed / counts).reshape([batch, d])
}

// ─── UtteranceEncoder ─────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct UtteranceEncoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub rnn:       RnnStack<B>,
    pub dropout:   Dropout,
    pub pad_id:    usize,
}

impl<B: Backend> UtteranceEncoder<B> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vocab_size:    usize,
        embedding_dim: usize,
        hidden_dim:    usize,
        n_layers:      usize,
        rnn_type:      RnnType,
        dropout:       f64,
        pad_id:        usize,
        device:        &B::Device,
    ) -> Self {
        Self {
            embedding: EmbeddingConfig::new(vocab_size, embedding_dim).init(device),
            rnn:       RnnStack::new(rnn_type, embedding_dim, hidden_dim, n_layers, dropout, device),
            dropout:   DropoutConfig::new(dropout).init(),
            pad_id,
        }
    }

    /// tokens: [n, uttr_len] → [n, hidden_dim]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let mask = tokens.clone().equal_elem(self.pad_id as i64).bool_not().float();
        let embedded = self.dropout.forward(self.embedding.forward(tokens));
        masked_mean(self.rnn.forward(embedded), mask)
    }
}

// ─── FloorEncoder ─────────────────────────────────────────────────────────────

/// `embedding` is `None` for `FloorEncoding::None`.
#[derive(Module, Debug)]
pub struct FloorEncoder<B: Backend> {
    pub embedding: Option<Embedding<B>>,
    /// Embed same/different speaker instead of the speaker id
    pub relative:  bool,
}

impl<B: Backend> FloorEncoder<B> {
    pub fn new(mode: FloorEncoding, n_floors: usize, dim: usize, device: &B::Device) -> Self {
        let embedding = match mode {
            FloorEncoding::None => None,
            FloorEncoding::Relative => Some(EmbeddingConfig::new(2, dim).init(device)),
            FloorEncoding::Absolute => Some(EmbeddingConfig::new(n_floors.max(1), dim).init(device)),
        };
        Self { embedding, relative: mode == FloorEncoding::Relative }
    }

    /// Width of the vectors `forward` returns, 0 when disabled.
    pub fn output_dim(&self) -> usize {
        self.embedding
            .as_ref()
            .map(|e| e.weight.dims()[1])
            .unwrap_or(0)
    }

    /// Speaker index fed to the embedding for every history slot.
    ///
    /// floors: [batch, h], target_floors: [batch] → [batch, h]
    pub fn floor_ids(&self, floors: Tensor<B, 2, Int>, target_floors: Tensor<B, 1, Int>) -> Tensor<B, 2, Int> {
        if self.relative {
            let [_batch, h] = floors.dims();
            let target = target_floors.unsqueeze_dim::<2>(1).repeat_dim(1, h);
            floors.equal(target).int()
        } else {
            floors
        }
    }

    /// floors: [batch, h] → Some([batch, h, dim]) or None when disabled
    pub fn forward(&self, floors: Tensor<B, 2, Int>, target_floors: Tensor<B, 1, Int>) -> Option<Tensor<B, 3>> {
        self.embedding
            .as_ref()
            .map(|embedding| embedding.forward(self.floor_ids(floors, target_floors)))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_masked_mean_ignores_padding() {
        let device = Default::default();
        let x = Tensor::<B, 3>::from_floats([[[1.0, 2.0], [3.0, 4.0], [100.0, 100.0]]], &device);
        let mask = Tensor::<B, 2>::from_floats([[1.0, 1.0, 0.0]], &device);
        let pooled: Vec<f32> = masked_mean(x, mask).into_data().iter::<f32>().collect();
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn test_masked_mean_all_pad_is_zero() {
        let device = Default::default();
        let x = Tensor::<B, 3>::ones([1, 2, 3], &device);
        let mask = Tensor::<B, 2>::zeros([1, 2], &device);
        let pooled: Vec<f32> = masked_mean(x, mask).into_data().iter::<f32>().collect();
        assert_eq!(pooled, vec![0.0; 3]);
    }

    #[test]
    fn test_rnn_stack_shapes() {
        let device = Default::default();
        for rnn_type in [RnnType::Gru, RnnType::Lstm] {
            let rnn = RnnStack::<B>::new(rnn_type, 4, 6, 2, 0.0, &device);
            let out = rnn.forward(Tensor::zeros([3, 5, 4], &device));
            assert_eq!(out.dims(), [3, 5, 6]);
        }
    }

    #[test]
    fn test_utterance_encoder_shape() {
        let device = Default::default();
        let encoder = UtteranceEncoder::<B>::new(10, 4, 6, 1, RnnType::Gru, 0.0, 0, &device);
        let tokens = Tensor::<B, 2, Int>::from_ints([[2, 5, 3, 0], [2, 3, 0, 0]], &device);
        assert_eq!(encoder.forward(tokens).dims(), [2, 6]);
    }

    #[test]
    fn test_relative_floor_ids() {
        let device = Default::default();
        let encoder = FloorEncoder::<B>::new(FloorEncoding::Relative, 2, 3, &device);
        let floors = Tensor::<B, 2, Int>::from_ints([[0, 1, 0], [1, 1, 0]], &device);
        let targets = Tensor::<B, 1, Int>::from_ints([0, 0], &device);
        let ids: Vec<i64> = encoder
            .floor_ids(floors, targets)
            .into_data()
            .iter::<i64>()
            .collect();
        assert_eq!(ids, vec![1, 0, 1, 0, 0, 1]);
        assert_eq!(encoder.output_dim(), 3);
    }

    #[test]
    fn test_disabled_floor_encoder() {
        let device = Default::default();
        let encoder = FloorEncoder::<B>::new(FloorEncoding::None, 2, 3, &device);
        let floors = Tensor::<B, 2, Int>::zeros([1, 2], &device);
        let targets = Tensor::<B, 1, Int>::zeros([1], &device);
        assert!(encoder.forward(floors, targets).is_none());
        assert_eq!(encoder.output_dim(), 0);
    }
}
