// ============================================================
// Layer 4 - Data Source
// ============================================================
// Turns one split of dialogs into model-ready examples and
// hands them out in batches.
//
// For every utterance u_i of a dialog one example is built:
//
//   context  = [u_{i-H+1}, ..., u_{i-1}, u_i]     (H = history_len)
//   label    = dialog_act(u_i)
//
// Contexts shorter than H are front-padded with all-pad rows so
// the target utterance is always the last row.
//
// Usage per pass:
//   source.epoch_init(shuffle);
//   while let Some(batch) = source.next(batch_size) { ... }

use anyhow::Result;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;
use std::fmt;

use crate::domain::dialog::Dialog;
use crate::error::DaRecogError;
use crate::infra::tokenizer_store::UtteranceTokenizer;

/// Shapes and label vocabularies shared by the three splits.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub history_len:  usize,
    pub max_uttr_len: usize,
    pub dialog_acts:  Vec<String>,
    pub floors:       Vec<String>,
}

/// One tokenised example.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogSample {
    /// `history_len` rows of `max_uttr_len` ids, target last
    pub utterances:   Vec<Vec<u32>>,
    /// Floor id of every row
    pub floors:       Vec<usize>,
    pub target_floor: usize,
    pub label:        usize,
}

/// A batch of examples, flattened row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogBatch {
    pub size:          usize,
    pub history_len:   usize,
    pub max_uttr_len:  usize,
    /// `[size, history_len, max_uttr_len]`
    pub tokens:        Vec<u32>,
    /// `[size, history_len]`
    pub floors:        Vec<usize>,
    /// `[size]`
    pub target_floors: Vec<usize>,
    /// `[size]` gold dialog act ids
    pub labels:        Vec<usize>,
}

impl DialogBatch {
    pub fn from_samples(samples: &[&DialogSample], history_len: usize, max_uttr_len: usize) -> Self {
        Self {
            size: samples.len(),
            history_len,
            max_uttr_len,
            tokens: samples
                .iter()
                .flat_map(|s| s.utterances.iter().flatten().copied())
                .collect(),
            floors: samples.iter().flat_map(|s| s.floors.iter().copied()).collect(),
            target_floors: samples.iter().map(|s| s.target_floor).collect(),
            labels: samples.iter().map(|s| s.label).collect(),
        }
    }

    /// Add the examples of `other`, which must share this batch's shapes.
    pub fn append(&mut self, other: DialogBatch) {
        if self.size == 0 {
            *self = other;
            return;
        }
        debug_assert_eq!(
            (self.history_len, self.max_uttr_len),
            (other.history_len, other.max_uttr_len)
        );
        self.size += other.size;
        self.tokens.extend(other.tokens);
        self.floors.extend(other.floors);
        self.target_floors.extend(other.target_floors);
        self.labels.extend(other.labels);
    }
}

/// Counts logged after a split is loaded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataStatistics {
    pub n_dialogs:             usize,
    pub n_examples:            usize,
    pub mean_uttr_len:         f64,
    pub n_truncated_uttrs:     usize,
}

impl fmt::Display for DataStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

pub struct DataSource {
    samples:        Vec<DialogSample>,
    order:          Vec<usize>,
    cursor:         usize,
    rng:            StdRng,
    history_len:    usize,
    max_uttr_len:   usize,
    pub statistics: DataStatistics,
}

impl DataSource {
    /// Tokenise every utterance of `dialogs` and build the examples.
    /// Unknown labels or floors are errors.
    pub fn new(
        dialogs:   &[Dialog],
        tokenizer: &UtteranceTokenizer,
        settings:  &SourceSettings,
        seed:      u64,
    ) -> Result<Self> {
        let history_len = settings.history_len.max(1);
        let max_uttr_len = settings.max_uttr_len;

        let mut samples = Vec::new();
        let mut total_len = 0usize;
        let mut n_truncated = 0usize;

        for dialog in dialogs {
            let mut rows = Vec::with_capacity(dialog.utterances.len());
            let mut floors = Vec::with_capacity(dialog.utterances.len());
            let mut labels = Vec::with_capacity(dialog.utterances.len());

            for uttr in &dialog.utterances {
                let encoded = tokenizer.encode(&uttr.text, max_uttr_len)?;
                total_len += encoded.length;
                n_truncated += usize::from(encoded.truncated);
                rows.push(encoded.ids);
                floors.push(index_of(&settings.floors, &uttr.floor)
                    .ok_or_else(|| DaRecogError::UnknownFloor(uttr.floor.clone()))?);
                labels.push(index_of(&settings.dialog_acts, &uttr.dialog_act)
                    .ok_or_else(|| DaRecogError::UnknownLabel(uttr.dialog_act.clone()))?);
            }

            for target in 0..rows.len() {
                let start = (target + 1).saturating_sub(history_len);
                let n_pad = history_len - (target + 1 - start);

                let mut utterances = vec![tokenizer.padding_row(max_uttr_len); n_pad];
                utterances.extend(rows[start..=target].iter().cloned());
                let mut sample_floors = vec![0; n_pad];
                sample_floors.extend_from_slice(&floors[start..=target]);

                samples.push(DialogSample {
                    utterances,
                    floors:       sample_floors,
                    target_floor: floors[target],
                    label:        labels[target],
                });
            }
        }

        let statistics = DataStatistics {
            n_dialogs:         dialogs.len(),
            n_examples:        samples.len(),
            mean_uttr_len:     if samples.is_empty() { 0.0 } else { total_len as f64 / samples.len() as f64 },
            n_truncated_uttrs: n_truncated,
        };

        Ok(Self::from_samples(samples, history_len, max_uttr_len, seed, statistics))
    }

    pub fn from_samples(
        samples:      Vec<DialogSample>,
        history_len:  usize,
        max_uttr_len: usize,
        seed:         u64,
        statistics:   DataStatistics,
    ) -> Self {
        let order = (0..samples.len()).collect();
        Self {
            samples,
            order,
            cursor: 0,
            rng: StdRng::seed_from_u64(seed),
            history_len,
            max_uttr_len,
            statistics,
        }
    }

    /// Rewind to the first example, optionally in a fresh random order.
    pub fn epoch_init(&mut self, shuffle: bool) {
        self.order = (0..self.samples.len()).collect();
        if shuffle {
            self.order.shuffle(&mut self.rng);
        }
        self.cursor = 0;
    }

    /// Up to `batch_size` examples, `None` once the pass is exhausted.
    pub fn next(&mut self, batch_size: usize) -> Option<DialogBatch> {
        if self.cursor >= self.order.len() || batch_size == 0 {
            return None;
        }
        let end = (self.cursor + batch_size).min(self.order.len());
        let picked: Vec<&DialogSample> = self.order[self.cursor..end]
            .iter()
            .map(|&i| &self.samples[i])
            .collect();
        self.cursor = end;
        Some(DialogBatch::from_samples(&picked, self.history_len, self.max_uttr_len))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn index_of(vocab: &[String], value: &str) -> Option<usize> {
    vocab.iter().position(|v| v == value)
}
