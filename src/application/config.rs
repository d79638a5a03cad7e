// ============================================================
// Layer 2 - Run Configuration
// ============================================================
// A run is configured by two sources:
//
//   1. the CLI flags (TrainArgs)          - high priority
//   2. the corpus configuration           - low priority
//
// Both are turned into JSON maps and overlaid so that a key
// present on the CLI side is never overwritten. The merged
// map is then read back into typed structs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::cli::commands::TrainArgs;
use crate::data::corpus::CorpusConfig;
use crate::domain::selectors::{
    FloorEncoding, ModelKind, ModelSize, OptimizerKind, RnnType, TokenizerKind,
};

/// Task name used for paths and corpus lookup.
pub const TASK: &str = "da_recog";

/// Weight decay used for transformer fine-tuning (RoBERTa/BERT papers).
const TRANSFORMER_L2_PENALTY: f64 = 0.01;

pub type ConfigMap = Map<String, Value>;

/// Key-biased union: every key of `cli` keeps its value,
/// keys only in `corpus` are added unchanged.
pub fn merge_configs(cli: ConfigMap, corpus: ConfigMap) -> ConfigMap {
    let mut merged = cli;
    for (key, value) in corpus {
        merged.entry(key).or_insert(value);
    }
    merged
}

fn to_map<T: Serialize>(value: &T) -> Result<ConfigMap> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a config object, got {other}"),
    }
}

/// The merged configuration, typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(flatten)]
    pub args: TrainArgs,

    #[serde(flatten)]
    pub corpus: CorpusConfig,

    /// Sorted view of every merged key, kept for logging
    #[serde(skip)]
    entries: ConfigMap,
}

/// Closed selectors parsed out of the string flags.
#[derive(Debug, Clone, Copy)]
pub struct Selectors {
    pub model:         ModelKind,
    pub model_size:    ModelSize,
    pub rnn_type:      RnnType,
    pub floor_encoder: FloorEncoding,
    pub tokenizer:     TokenizerKind,
    pub optimizer:     OptimizerKind,
}

impl RunConfig {
    /// Look up the corpus configuration and merge it under the CLI flags.
    pub fn resolve(args: TrainArgs) -> Result<Self> {
        let corpus = CorpusConfig::for_corpus(&args.corpus, TASK)?;
        let mut merged = merge_configs(to_map(&args)?, to_map(&corpus)?);

        if args.model.parse::<ModelKind>()? == ModelKind::Transformer {
            merged.insert("l2_penalty".to_string(), Value::from(TRANSFORMER_L2_PENALTY));
        }

        let mut config: RunConfig = serde_json::from_value(Value::Object(merged.clone()))
            .context("Merged configuration does not match the expected schema")?;
        config.entries = merged;
        Ok(config)
    }

    /// Fails on the first unknown selector.
    pub fn selectors(&self) -> Result<Selectors> {
        Ok(Selectors {
            model:         self.args.model.parse()?,
            model_size:    self.args.model_size.parse()?,
            rnn_type:      self.args.rnn_type.parse()?,
            floor_encoder: self.args.floor_encoder.parse()?,
            tokenizer:     self.args.tokenizer.parse()?,
            optimizer:     self.args.optimizer.parse()?,
        })
    }

    /// `key: value` lines in sorted key order.
    pub fn hyperparameter_lines(&self) -> Vec<String> {
        // serde_json::Map keeps insertion order under `preserve_order`
        let sorted: BTreeMap<&String, &Value> = self.entries.iter().collect();
        sorted
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{key}: {s}"),
                other => format!("{key}: {other}"),
            })
            .collect()
    }
}
