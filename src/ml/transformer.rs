use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::data::batcher::DialogTensors;
use crate::domain::selectors::{FloorEncoding, TransformerShape};
use crate::ml::encoders::{masked_mean, FloorEncoder};
use crate::ml::DialogActClassifier;

#[derive(Config, Debug)]
pub struct TransformerClassifierConfig {
    pub vocab_size:    usize,
    pub n_labels:      usize,
    pub n_floors:      usize,
    pub pad_id:        usize,
    /// history_len * max_uttr_len
    pub max_seq_len:   usize,
    pub d_model:       usize,
    pub num_heads:     usize,
    pub num_layers:    usize,
    pub d_ff:          usize,
    pub floor_encoder: FloorEncoding,
    pub dropout:       f64,
}

impl TransformerClassifierConfig {
    /// Sizes taken from a `--model_size` preset.
    #[allow(clippy::too_many_arguments)]
    pub fn from_shape(
        shape:         TransformerShape,
        vocab_size:    usize,
        n_labels:      usize,
        n_floors:      usize,
        pad_id:        usize,
        max_seq_len:   usize,
        floor_encoder: FloorEncoding,
        dropout:       f64,
    ) -> Self {
        Self::new(
            vocab_size, n_labels, n_floors, pad_id, max_seq_len,
            shape.d_model, shape.num_heads, shape.num_layers, shape.d_ff,
            floor_encoder, dropout,
        )
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerClassifier<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        // Floor vectors are added to the token vectors, so they share d_model
        let floor_encoder = FloorEncoder::new(self.floor_encoder, self.n_floors, self.d_model, device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let classifier = LinearConfig::new(self.d_model, self.n_labels).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        TransformerClassifier {
            token_embedding, position_embedding, floor_encoder, layers,
            final_norm, classifier, dropout,
            pad_id: self.pad_id,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// pad_mask is true where the position is padding.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_output = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

/// Encodes the whole history window as one token sequence.
#[derive(Module, Debug)]
pub struct TransformerClassifier<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub floor_encoder:      FloorEncoder<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub classifier:         Linear<B>,
    pub dropout:            Dropout,
    pub pad_id:             usize,
}

impl<B: Backend> TransformerClassifier<B> {
    /// tokens: [N, H, L] → logits: [N, n_labels]
    pub fn forward(
        &self,
        tokens:        Tensor<B, 3, Int>,
        floors:        Tensor<B, 2, Int>,
        target_floors: Tensor<B, 1, Int>,
    ) -> Tensor<B, 2> {
        let [batch_size, h, l] = tokens.dims();
        let seq_len = h * l;

        let input_ids = tokens.reshape([batch_size, seq_len]);
        let pad_mask  = input_ids.clone().equal_elem(self.pad_id as i64);
        let tok_emb   = self.token_embedding.forward(input_ids);

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let mut x = tok_emb + self.position_embedding.forward(positions);

        // Every token of history slot i gets the floor vector of slot i
        if let Some(floor_vecs) = self.floor_encoder.forward(floors, target_floors) {
            let [_, _, d_model] = floor_vecs.dims();
            let per_token = floor_vecs
                .unsqueeze_dim::<4>(2)
                .repeat_dim(2, l)
                .reshape([batch_size, seq_len, d_model]);
            x = x + per_token;
        }

        let mut x = self.dropout.forward(x);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        let x = self.final_norm.forward(x); // [batch, seq_len, d_model]

        let keep = pad_mask.bool_not().float();
        let pooled = masked_mean(x, keep);
        self.classifier.forward(self.dropout.forward(pooled))
    }
}

impl<B: Backend> DialogActClassifier<B> for TransformerClassifier<B> {
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

    fn tiny(floor_encoder: FloorEncoding) -> TransformerClassifierConfig {
        let shape = TransformerShape { d_model: 8, num_heads: 2, num_layers: 1, d_ff: 16 };
        TransformerClassifierConfig::from_shape(shape, 12, 4, 2, 0, 6, floor_encoder, 0.0)
    }

    #[test]
    fn test_logit_shape() {
        let device = Default::default();
        let batch = DialogTensors::<B> {
            tokens: Tensor::<B, 1, Int>::from_ints([0, 0, 0, 2, 7, 3, 2, 5, 3, 2, 6, 3], &device)
                .reshape([2, 2, 3]),
            floors:        Tensor::from_ints([[0, 0], [0, 1]], &device),
            target_floors: Tensor::from_ints([0, 1], &device),
            labels:        Tensor::from_ints([0, 3], &device),
        };
        for floor in [FloorEncoding::None, FloorEncoding::Relative, FloorEncoding::Absolute] {
            let model = tiny(floor).init::<B>(&device);
            assert_eq!(model.logits(&batch).dims(), [2, 4]);
        }
    }

    #[test]
    fn test_preset_sizes() {
        let config = TransformerClassifierConfig::from_shape(
            crate::domain::selectors::ModelSize::Base.shape(),
            100, 4, 2, 0, 200, FloorEncoding::None, 0.1,
        );
        assert_eq!(config.d_model, 768);
        assert_eq!(config.num_layers, 12);
    }
}
