// ============================================================
// Layer 1 - CLI Arguments
// ============================================================
// Every flag of a training run. Flags keep their snake_case
// names (`--init_lr`, `--check_loss_after_n_step`, ...).
//
// clap's derive macros generate help text, error messages for
// malformed values and type conversion; serde lets the parsed
// arguments be merged with the corpus configuration as a map.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

/// Boolean flags take an explicit value: `--save_model true`.
/// `true`, `True` and `1` are true, anything else is false.
pub fn parse_bool(value: &str) -> Result<bool, String> {
    Ok(matches!(value, "true" | "True" | "1"))
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[command(rename_all = "snake_case")]
pub struct TrainArgs {
    // ── model - architecture ──────────────────────────────────────────────────
    /// Model architecture: hre, hre_sep_uttr_enc or roberta
    #[arg(long, default_value = "hre")]
    pub model: String,

    /// Transformer size for roberta: base, large or large-mnli
    #[arg(long, default_value = "large-mnli")]
    pub model_size: String,

    /// Recurrent cell of the HRE encoders: gru or lstm
    #[arg(long, default_value = "gru")]
    pub rnn_type: String,

    /// Floor encoder: none, rel or abs
    #[arg(long, default_value = "none")]
    pub floor_encoder: String,

    /// Tokenizer: ws (whitespace word-level) or roberta
    #[arg(long, default_value = "ws")]
    pub tokenizer: String,

    // ── model - numbers ───────────────────────────────────────────────────────
    #[arg(long, default_value_t = 10000)]
    pub vocab_size: usize,

    /// Number of utterances fed to the model, target included
    #[arg(long, default_value_t = 5)]
    pub history_len: usize,

    #[arg(long, default_value_t = 200)]
    pub word_embedding_dim: usize,

    /// Embedding size of the floor encoder
    #[arg(long, default_value_t = 30)]
    pub attr_embedding_dim: usize,

    #[arg(long, default_value_t = 500)]
    pub sent_encoder_hidden_dim: usize,

    #[arg(long, default_value_t = 2)]
    pub n_sent_encoder_layers: usize,

    #[arg(long, default_value_t = 500)]
    pub dial_encoder_hidden_dim: usize,

    #[arg(long, default_value_t = 2)]
    pub n_dial_encoder_layers: usize,

    // ── training ──────────────────────────────────────────────────────────────
    /// Random initialization seed
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Utterances are truncated to this many tokens
    #[arg(long, default_value_t = 40)]
    pub max_uttr_len: usize,

    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    #[arg(long, default_value_t = 0.0)]
    pub l2_penalty: f64,

    /// Optimizer: adam or adamw (both run AdamW with weight decay = l2_penalty)
    #[arg(long, default_value = "adam")]
    pub optimizer: String,

    #[arg(long, default_value_t = 0.001)]
    pub init_lr: f64,

    /// Training stops once the learning rate decays to this value
    #[arg(long, default_value_t = 1e-7)]
    pub min_lr: f64,

    #[arg(long, default_value_t = 0.5)]
    pub lr_decay_rate: f64,

    /// Gradient norm ceiling, 0 disables clipping
    #[arg(long, default_value_t = 1.0)]
    pub gradient_clip: f64,

    #[arg(long, default_value_t = 20)]
    pub n_epochs: usize,

    #[arg(long, default_value_t = 30)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 60)]
    pub eval_batch_size: usize,

    // ── management ────────────────────────────────────────────────────────────
    /// Checkpoint to load before training
    #[arg(long)]
    pub model_path: Option<String>,

    /// Corpus: swda or dailydialog
    #[arg(long, default_value = "swda")]
    pub corpus: String,

    #[arg(long, default_value_t = false, action = ArgAction::Set, value_parser = parse_bool)]
    pub enable_log: bool,

    #[arg(long, default_value_t = false, action = ArgAction::Set, value_parser = parse_bool)]
    pub save_model: bool,

    #[arg(long, default_value_t = 100)]
    pub check_loss_after_n_step: usize,

    #[arg(long, default_value_t = 1000)]
    pub validate_after_n_step: usize,

    /// Note appended to the names of saved files
    #[arg(long)]
    pub filename_note: Option<String>,

    /// Directory holding pretrained tokenizers (roberta-{model_size}/tokenizer.json)
    #[arg(long, default_value = "../data/pretrained")]
    pub pretrained_dir: String,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: TrainArgs,
    }

    #[test]
    fn test_defaults() {
        let args = Harness::parse_from(["da-recog"]).args;
        assert_eq!(args.model, "hre");
        assert_eq!(args.batch_size, 30);
        assert_eq!(args.validate_after_n_step, 1000);
        assert!(!args.save_model);
        assert!(args.model_path.is_none());
    }

    #[test]
    fn test_snake_case_flags_and_bool_values() {
        let args = Harness::parse_from([
            "da-recog",
            "--init_lr", "0.01",
            "--save_model", "True",
            "--enable_log", "0",
            "--floor_encoder", "rel",
        ])
        .args;
        assert_eq!(args.init_lr, 0.01);
        assert!(args.save_model);
        assert!(!args.enable_log);
        assert_eq!(args.floor_encoder, "rel");
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("1"), Ok(true));
        assert_eq!(parse_bool("true"), Ok(true));
        assert_eq!(parse_bool("yes"), Ok(false));
    }
}
