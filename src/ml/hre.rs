// ============================================================
// Layer 5 - Hierarchical Recurrent Encoder (HRE)
// ============================================================
// Two-level recurrent classifier over a window of utterances:
//
//   tokens [N, H, L]
//     │  UtteranceEncoder (per utterance)
//     ▼
//   [N, H, d_sent]  ++  floor embedding [N, H, d_attr]
//     │  dialog RnnStack
//     ▼
//   last position [N, d_dial]  (++ target utterance [N, d_sent])
//     │  dropout → linear
//     ▼
//   logits [N, n_labels]
//
// The `hre_sep_uttr_enc` variant re-encodes the target utterance
// with its own utterance encoder and concatenates it with the
// dialog state before the classifier.

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::data::batcher::DialogTensors;
use crate::domain::selectors::{FloorEncoding, RnnType};
use crate::ml::encoders::{FloorEncoder, RnnStack, UtteranceEncoder};
use crate::ml::DialogActClassifier;

#[derive(Config, Debug)]
pub struct HreConfig {
    pub vocab_size:              usize,
    pub n_labels:                usize,
    pub n_floors:                usize,
    pub pad_id:                  usize,
    pub word_embedding_dim:      usize,
    pub attr_embedding_dim:      usize,
    pub sent_encoder_hidden_dim: usize,
    pub n_sent_encoder_layers:   usize,
    pub dial_encoder_hidden_dim: usize,
    pub n_dial_encoder_layers:   usize,
    pub rnn_type:                RnnType,
    pub floor_encoder:           FloorEncoding,
    pub dropout:                 f64,
    /// Encode the target utterance a second time with its own encoder
    #[config(default = false)]
    pub separate_target_encoder: bool,
}

impl HreConfig {
    fn utterance_encoder<B: Backend>(&self, device: &B::Device) -> UtteranceEncoder<B> {
        UtteranceEncoder::new(
            self.vocab_size,
            self.word_embedding_dim,
            self.sent_encoder_hidden_dim,
            self.n_sent_encoder_layers,
            self.rnn_type,
            self.dropout,
            self.pad_id,
            device,
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> HreModel<B> {
        let floor_encoder = FloorEncoder::new(
            self.floor_encoder,
            self.n_floors,
            self.attr_embedding_dim,
            device,
        );
        let dial_input = self.sent_encoder_hidden_dim + floor_encoder.output_dim();
        let dial_encoder = RnnStack::new(
            self.rnn_type,
            dial_input,
            self.dial_encoder_hidden_dim,
            self.n_dial_encoder_layers,
            self.dropout,
            device,
        );

        let target_encoder = self
            .separate_target_encoder
            .then(|| self.utterance_encoder(device));
        let classifier_input = self.dial_encoder_hidden_dim
            + if self.separate_target_encoder { self.sent_encoder_hidden_dim } else { 0 };

        HreModel {
            uttr_encoder: self.utterance_encoder(device),
            floor_encoder,
            dial_encoder,
            target_encoder,
            classifier: LinearConfig::new(classifier_input, self.n_labels).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct HreModel<B: Backend> {
    pub uttr_encoder:   UtteranceEncoder<B>,
    pub floor_encoder:  FloorEncoder<B>,
    pub dial_encoder:   RnnStack<B>,
    pub target_encoder: Option<UtteranceEncoder<B>>,
    pub classifier:     Linear<B>,
    pub dropout:        Dropout,
}

impl<B: Backend> HreModel<B> {
    /// tokens: [N, H, L] → logits: [N, n_labels]
    pub fn forward(
        &self,
        tokens:        Tensor<B, 3, Int>,
        floors:        Tensor<B, 2, Int>,
        target_floors: Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        let [n, h, l] = tokens.dims();

        let uttr_vecs = self
            .uttr_encoder
            .forward(tokens.clone().reshape([n * h, l]));
        let [_, d_sent] = uttr_vecs.dims();
        let uttr_vecs = uttr_vecs.reshape([n, h, d_sent]);

        let dial_input = match self.floor_encoder.forward(floors, target_floors) {
            Some(floor_vecs) => Tensor::cat(vec![uttr_vecs, floor_vecs], 2),
            None => uttr_vecs,
        };

        let dial_states = self.dial_encoder.forward(dial_input);
        let [_, _, d_dial] = dial_states.dims();
        // The target utterance is always the last history slot
        let mut features = dial_states
            .slice([0..n, h - 1..h, 0..d_dial])
            .reshape([n, d_dial]);

        if let Some(target_encoder) = &self.target_encoder {
            let target_tokens = tokens.slice([0..n, h - 1..h, 0..l]).reshape([n, l]);
            features = Tensor::cat(vec![features, target_encoder.forward(target_tokens)], 1);
        }

        self.classifier.forward(self.dropout.forward(features))
    }
}

impl<B: Backend> DialogActClassifier<B> for HreModel<B> {
    fn logits(&self, batch: &DialogTensors<B>) -> Tensor<B, 2> {
        self.forward(
            batch.tokens.clone(),
            batch.floors.clone(),
            batch.target_floors.clone(),
        )
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn tiny_config(floor_encoder: FloorEncoding, separate: bool) -> HreConfig {
        HreConfig::new(12, 3, 2, 0, 4, 2, 5, 1, 6, 1, RnnType::Gru, floor_encoder, 0.0)
            .with_separate_target_encoder(separate)
    }

    fn batch(device: &<B as Backend>::Device) -> DialogTensors<B> {
        DialogTensors {
            tokens: Tensor::<B, 1, Int>::from_ints(
                [0, 0, 0, 2, 5, 3, 2, 6, 3, 2, 7, 3, 2, 8, 3, 2, 9, 3],
                device,
            )
            .reshape([2, 3, 3]),
            floors:        Tensor::from_ints([[0, 1, 0], [1, 0, 1]], device),
            target_floors: Tensor::from_ints([0, 1], device),
            labels:        Tensor::from_ints([1, 2], device),
        }
    }

    #[test]
    fn test_logit_shapes_for_every_variant() {
        let device = Default::default();
        for floor in [FloorEncoding::None, FloorEncoding::Relative, FloorEncoding::Absolute] {
            for separate in [false, true] {
                let model = tiny_config(floor, separate).init::<B>(&device);
                assert_eq!(model.logits(&batch(&device)).dims(), [2, 3]);
            }
        }
    }

    #[test]
    fn test_lstm_variant() {
        let device = Default::default();
        let config = HreConfig {
            rnn_type: RnnType::Lstm,
            ..tiny_config(FloorEncoding::Absolute, false)
        };
        let model = config.init::<B>(&device);
        assert_eq!(model.logits(&batch(&device)).dims(), [2, 3]);
    }

    #[test]
    fn test_separate_encoder_only_when_requested() {
        let device = Default::default();
        assert!(tiny_config(FloorEncoding::None, false).init::<B>(&device).target_encoder.is_none());
        assert!(tiny_config(FloorEncoding::None, true).init::<B>(&device).target_encoder.is_some());
    }
}
