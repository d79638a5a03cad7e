// ============================================================
// Layer 4 - Corpus Configuration
// ============================================================
// Per-corpus paths and constants: where the dataset and word
// counts live, where logs and checkpoints go, the dialog act
// label vocabulary and the speaker floors.
//
// These values are the lower-priority half of the run
// configuration; any key the CLI also defines is ignored.

use serde::{Deserialize, Serialize};

use crate::error::DaRecogError;

/// Switchboard DAMSL tag set, in label-id order.
const SWDA_DIALOG_ACTS: &[&str] = &[
    "sd", "b", "sv", "aa", "%", "ba", "qy", "x", "ny", "fc", "qw", "nn", "bk", "h", "qy^d",
    "fo_o_fw_by_bc", "bh", "^q", "bf", "na", "ad", "^2", "b^m", "qo", "qh", "^h", "ar", "ng",
    "br", "no", "fp", "qrr", "arp_nd", "t3", "oo_co_cc", "t1", "bd", "aap_am", "^g", "qw^d",
    "fa", "ft", "+",
];

const DAILYDIALOG_DIALOG_ACTS: &[&str] = &["inform", "question", "directive", "commissive"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub task:            String,
    pub task_data_dir:   String,
    pub dataset_path:    String,
    pub word_count_path: String,
    pub log_dir:         String,
    pub model_dir:       String,
    pub dialog_acts:     Vec<String>,
    pub floors:          Vec<String>,
}

impl CorpusConfig {
    /// Configuration provider lookup by corpus name.
    pub fn for_corpus(corpus: &str, task: &str) -> Result<Self, DaRecogError> {
        let dialog_acts = match corpus {
            "swda"        => SWDA_DIALOG_ACTS,
            "dailydialog" => DAILYDIALOG_DIALOG_ACTS,
            other => return Err(DaRecogError::UnknownCorpus(other.to_string())),
        };

        let task_data_dir = format!("../data/{corpus}/{task}");
        Ok(Self {
            task:            task.to_string(),
            dataset_path:    format!("{task_data_dir}/dataset.txt"),
            word_count_path: format!("{task_data_dir}/word_count.txt"),
            log_dir:         format!("../log/{corpus}/{task}"),
            model_dir:       format!("../data/{corpus}/model/{task}"),
            task_data_dir,
            dialog_acts:     dialog_acts.iter().map(|s| s.to_string()).collect(),
            floors:          vec!["A".to_string(), "B".to_string()],
        })
    }
}
