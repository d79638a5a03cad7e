// ============================================================
// Domain Errors
// ============================================================
// Typed failures raised while resolving a run configuration,
// reading the corpus, or reading back statistics.
// Everything else flows through anyhow with context attached.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DaRecogError {
    /// `--corpus` names a corpus with no configuration provider
    #[error("unknown corpus '{0}'")]
    UnknownCorpus(String),

    /// A string selector (model, tokenizer, rnn type, ...) is not in its closed set
    #[error("unknown {kind} '{value}', expected one of: {expected}")]
    UnknownSelector {
        kind:     &'static str,
        value:    String,
        expected: &'static str,
    },

    /// The statistics reporter holds no values for this metric
    #[error("no values recorded for statistic '{0}'")]
    MissingStatistic(String),

    /// A dialog act in the dataset is not part of the corpus label set
    #[error("dialog act '{0}' is not in the corpus label set")]
    UnknownLabel(String),

    /// A floor (speaker) in the dataset is not one of the corpus floors
    #[error("floor '{0}' is not one of the corpus floors")]
    UnknownFloor(String),

    /// The tokenizer vocabulary lacks a token the data pipeline relies on
    #[error("tokenizer has no id for special token '{0}'")]
    MissingSpecialToken(String),
}
