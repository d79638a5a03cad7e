// ============================================================
// Layer 3 - Dialog Domain Types
// ============================================================
// The dataset file is one JSON document:
//
//   {
//     "train": [ { "utterances": [ {"floor": "A", "text": "...", "dialog_act": "sd"}, ... ] }, ... ],
//     "dev":   [ ... ],
//     "test":  [ ... ]
//   }
//
// Every utterance is one labelled example; its context is the
// utterance itself plus the ones preceding it in the dialog.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// One turn of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    /// Speaker of the turn, e.g. "A" or "B"
    pub floor: String,

    /// Whitespace-tokenizable text
    pub text: String,

    /// Dialog act label from the corpus label set
    pub dialog_act: String,
}

impl Utterance {
    pub fn new(
        floor:      impl Into<String>,
        text:       impl Into<String>,
        dialog_act: impl Into<String>,
    ) -> Self {
        Self {
            floor:      floor.into(),
            text:       text.into(),
            dialog_act: dialog_act.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dialog {
    pub utterances: Vec<Utterance>,
}

/// The three splits of a dialogue-act corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogCorpus {
    pub train: Vec<Dialog>,
    pub dev:   Vec<Dialog>,
    pub test:  Vec<Dialog>,
}

impl DialogCorpus {
    /// Read and parse the dataset JSON; a missing file or a
    /// document without all three splits is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read dataset '{}'", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("Malformed dataset '{}'", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits() {
        let json = r#"{
            "train": [{"utterances": [
                {"floor": "A", "text": "hi there", "dialog_act": "fo_o_fw_by_bc"},
                {"floor": "B", "text": "hello", "dialog_act": "fo_o_fw_by_bc"}
            ]}],
            "dev": [],
            "test": []
        }"#;
        let corpus = DialogCorpus::from_json(json).unwrap();
        assert_eq!(corpus.train.len(), 1);
        assert_eq!(corpus.train[0].utterances[1].floor, "B");
        assert!(corpus.dev.is_empty());
    }

    #[test]
    fn test_missing_split_is_error() {
        let json = r#"{"train": [], "dev": []}"#;
        assert!(DialogCorpus::from_json(json).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = DialogCorpus::load("/nonexistent/dataset.txt").unwrap_err();
        assert!(err.to_string().contains("Cannot read dataset"));
    }
}
