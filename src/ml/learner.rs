// ============================================================
// Layer 5 - Learner
// ============================================================
// One model plus its optimiser, seen by the training loop only
// through the `Learner` trait:
//
//   train_step    - forward, cross-entropy, backward, global
//                   gradient norm clipping, optimiser step
//   evaluate_step - inference-mode forward, loss and predictions
//   to_bytes / load_bytes - the full parameter record
//
// Training runs on an AutodiffBackend. Evaluation uses
// model.valid(), which returns the same model on the inner
// backend with dropout off and no autodiff graph.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::data::{batcher::DialogBatcher, data_source::DialogBatch};
use crate::infra::stats_reporter::{stat_record, StatRecord};
use crate::ml::{grad_clip::clip_grad_norm, DialogActClassifier};

/// Predictions and statistics of one evaluation batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutput {
    pub predictions: Vec<usize>,
    pub stats:       StatRecord,
}

pub trait Learner {
    /// One optimiser step at learning rate `lr`; returns `loss` and `monitor`.
    fn train_step(&mut self, batch: &DialogBatch, lr: f64) -> Result<StatRecord>;

    /// No parameter update.
    fn evaluate_step(&self, batch: &DialogBatch) -> Result<EvalOutput>;

    /// Serialised parameter record.
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Replace every parameter with the record in `bytes`.
    fn load_bytes(&mut self, bytes: Vec<u8>) -> Result<()>;
}

type Bytes = BinBytesRecorder<FullPrecisionSettings>;

pub struct BurnLearner<B, M, O>
where
    B: AutodiffBackend,
{
    model:         M,
    optim:         O,
    device:        B::Device,
    /// Global gradient norm ceiling, 0 disables clipping
    gradient_clip: f64,
}

impl<B, M, O> BurnLearner<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + DialogActClassifier<B>,
    M::InnerModule: DialogActClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    pub fn new(model: M, optim: O, device: B::Device, gradient_clip: f64) -> Self {
        Self { model, optim, device, gradient_clip }
    }
}

impl<B, M, O> Learner for BurnLearner<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + DialogActClassifier<B>,
    M::InnerModule: DialogActClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    fn train_step(&mut self, batch: &DialogBatch, lr: f64) -> Result<StatRecord> {
        let tensors = DialogBatcher::<B>::new(self.device.clone()).batch(vec![batch.clone()]);
        let logits = self.model.logits(&tensors);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, tensors.labels);

        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        // Backward pass, clip over all parameters at once, AdamW update
        let grads = loss.backward();
        let mut grads = GradientsParams::from_grads(grads, &self.model);
        clip_grad_norm::<B, M>(&self.model, &mut grads, self.gradient_clip);
        self.model = self.optim.step(lr, self.model.clone(), grads);

        Ok(stat_record([("loss", loss_val), ("monitor", loss_val)]))
    }

    fn evaluate_step(&self, batch: &DialogBatch) -> Result<EvalOutput> {
        let model = self.model.valid();
        let tensors = DialogBatcher::<B::InnerBackend>::new(self.device.clone()).tensors(batch);
        let logits = model.logits(&tensors);

        let loss_val: f64 = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), tensors.labels)
            .into_scalar()
            .elem::<f64>();

        // argmax(1) returns shape [batch, 1] - flatten to [batch]
        let predictions = logits
            .argmax(1)
            .flatten::<1>(0, 1)
            .into_data()
            .iter::<i64>()
            .map(|p| p as usize)
            .collect();

        Ok(EvalOutput {
            predictions,
            stats: stat_record([("loss", loss_val), ("monitor", loss_val)]),
        })
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        <Bytes as Recorder<B>>::record(&Bytes::default(), self.model.clone().into_record(), ())
            .map_err(|e| anyhow::anyhow!("Failed to serialise model record: {e}"))
    }

    fn load_bytes(&mut self, bytes: Vec<u8>) -> Result<()> {
        let record = <Bytes as Recorder<B>>::load(&Bytes::default(), bytes, &self.device)
            .map_err(|e| {
                anyhow::anyhow!("Checkpoint does not match the model architecture: {e}")
            })?;
        self.model = self.model.clone().load_record(record);
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        optim::AdamWConfig,
    };

    use crate::domain::selectors::{FloorEncoding, RnnType};
    use crate::ml::hre::{HreConfig, HreModel};

    type B = Autodiff<NdArray>;

    fn learner(seed: u64) -> impl Learner {
        B::seed(seed);
        let device = Default::default();
        let model: HreModel<B> =
            HreConfig::new(12, 3, 2, 0, 4, 2, 5, 1, 6, 1, RnnType::Gru, FloorEncoding::Relative, 0.0)
                .init(&device);
        let optim = AdamWConfig::new().with_weight_decay(0.01).init::<B, HreModel<B>>();
        BurnLearner::new(model, optim, device, 1.0)
    }

    fn batch() -> DialogBatch {
        DialogBatch {
            size:          2,
            history_len:   2,
            max_uttr_len:  3,
            tokens:        vec![0, 0, 0, 2, 5, 3, 2, 6, 3, 2, 7, 3],
            floors:        vec![0, 0, 0, 1],
            target_floors: vec![0, 1],
            labels:        vec![1, 2],
        }
    }

    #[test]
    fn test_train_step_reports_finite_loss() {
        let mut learner = learner(1);
        let stats = learner.train_step(&batch(), 1e-3).unwrap();
        assert!(stats["loss"].is_finite());
        assert_eq!(stats["loss"], stats["monitor"]);
    }

    #[test]
    fn test_training_lowers_loss_on_a_fixed_batch() {
        let mut learner = learner(2);
        let before = learner.evaluate_step(&batch()).unwrap().stats["loss"];
        for _ in 0..30 {
            learner.train_step(&batch(), 1e-2).unwrap();
        }
        let after = learner.evaluate_step(&batch()).unwrap().stats["loss"];
        assert!(after < before, "loss did not drop: {before} -> {after}");
    }

    #[test]
    fn test_evaluate_step_predicts_every_example() {
        let output = learner(3).evaluate_step(&batch()).unwrap();
        assert_eq!(output.predictions.len(), 2);
        assert!(output.predictions.iter().all(|&p| p < 3));
    }

    #[test]
    fn test_bytes_round_trip_restores_predictions() {
        let mut trained = learner(4);
        for _ in 0..5 {
            trained.train_step(&batch(), 1e-2).unwrap();
        }
        let bytes = trained.to_bytes().unwrap();

        let mut fresh = learner(5);
        fresh.load_bytes(bytes).unwrap();
        assert_eq!(
            fresh.evaluate_step(&batch()).unwrap(),
            trained.evaluate_step(&batch()).unwrap()
        );
    }
}
