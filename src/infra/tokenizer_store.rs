// ============================================================
// Layer 6 - Tokenizer Store
// ============================================================
// Builds the tokenizer selected by `--tokenizer`:
//
//   ws      - word-level vocabulary from the corpus word counts,
//             written as a HuggingFace tokenizer JSON and loaded
//             back through the `tokenizers` crate
//   roberta - a pretrained BPE tokenizer.json from disk
//
// Both get the speaker tokens registered as special tokens, and
// both are wrapped in `UtteranceTokenizer`, which turns a text
// into a fixed-length id row `<s> ... </s> <pad> <pad>`.

use anyhow::{Context, Result};
use std::{fs, path::Path, str::FromStr};
use tokenizers::{AddedToken, Tokenizer};

use crate::domain::selectors::{ModelSize, TokenizerKind};
use crate::error::DaRecogError;

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const BOS_TOKEN: &str = "<s>";
pub const EOS_TOKEN: &str = "</s>";
pub const SPEAKER1_TOKEN: &str = "<speaker1>";
pub const SPEAKER2_TOKEN: &str = "<speaker2>";

/// Special tokens of the word-level vocabulary, in id order.
const WS_SPECIAL_TOKENS: [&str; 6] = [
    PAD_TOKEN, UNK_TOKEN, BOS_TOKEN, EOS_TOKEN, SPEAKER1_TOKEN, SPEAKER2_TOKEN,
];

pub struct TokenizerStore;

impl TokenizerStore {
    /// Build the tokenizer named by `kind`.
    pub fn load(
        kind:            TokenizerKind,
        word_count_path: &str,
        vocab_size:      usize,
        pretrained_dir:  &str,
        model_size:      ModelSize,
    ) -> Result<UtteranceTokenizer> {
        let tokenizer = match kind {
            TokenizerKind::Whitespace => {
                let counts = read_word_counts(word_count_path)?;
                build_whitespace(&counts, vocab_size)?
            }
            TokenizerKind::Roberta => {
                let path = Path::new(pretrained_dir)
                    .join(format!("roberta-{model_size}"))
                    .join("tokenizer.json");
                load_pretrained(&path)?
            }
        };
        UtteranceTokenizer::new(tokenizer)
    }
}

/// Parse a word count file: one `word count` pair per line.
pub fn read_word_counts(path: impl AsRef<Path>) -> Result<Vec<(String, usize)>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read word counts from '{}'", path.display()))?;

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(word), Some(count)) => {
                    let count = count.parse::<usize>().with_context(|| {
                        format!("Bad count on line {} of '{}'", i + 1, path.display())
                    })?;
                    Ok((word.to_string(), count))
                }
                _ => anyhow::bail!("Line {} of '{}' is not 'word count'", i + 1, path.display()),
            }
        })
        .collect()
}

/// Word-level tokenizer over the `vocab_size` most frequent words
/// (special tokens included in the budget).
pub fn build_whitespace(word_counts: &[(String, usize)], vocab_size: usize) -> Result<Tokenizer> {
    let mut words: Vec<&(String, usize)> = word_counts.iter().collect();
    // Frequency descending, ties by word so the ids are reproducible
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut vocab = serde_json::Map::new();
    for (id, token) in WS_SPECIAL_TOKENS.iter().enumerate() {
        vocab.insert(token.to_string(), serde_json::json!(id));
    }
    for (word, _) in words {
        if vocab.len() >= vocab_size.max(WS_SPECIAL_TOKENS.len()) {
            break;
        }
        let word = word.to_lowercase();
        if !vocab.contains_key(&word) {
            let id = vocab.len();
            vocab.insert(word, serde_json::json!(id));
        }
    }

    let added_tokens: Vec<serde_json::Value> = WS_SPECIAL_TOKENS
        .iter()
        .enumerate()
        .map(|(id, token)| {
            serde_json::json!({
                "id": id, "content": token, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            })
        })
        .collect();

    let tokenizer_json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "WhitespaceSplit" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": UNK_TOKEN
        }
    });

    let tokenizer = Tokenizer::from_str(&tokenizer_json.to_string())
        .map_err(|e| anyhow::anyhow!("Cannot build whitespace tokenizer: {e}"))?;
    tracing::info!("Whitespace tokenizer built with {} tokens", tokenizer.get_vocab_size(true));
    Ok(tokenizer)
}

/// Load a pretrained tokenizer JSON and register the speaker tokens.
pub fn load_pretrained(path: &Path) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| {
        anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e)
    })?;
    tokenizer.add_special_tokens(&[
        AddedToken::from(SPEAKER1_TOKEN, true),
        AddedToken::from(SPEAKER2_TOKEN, true),
    ]);
    tracing::info!("Loaded pretrained tokenizer from '{}'", path.display());
    Ok(tokenizer)
}

/// Tokenizer plus the special ids needed to frame an utterance.
pub struct UtteranceTokenizer {
    tokenizer: Tokenizer,
    pad_id:    u32,
    bos_id:    u32,
    eos_id:    u32,
}

/// One framed utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedUtterance {
    /// Exactly `max_len` ids
    pub ids:       Vec<u32>,
    /// Number of non-pad ids
    pub length:    usize,
    /// The text had more tokens than fit
    pub truncated: bool,
}

impl UtteranceTokenizer {
    pub fn new(tokenizer: Tokenizer) -> Result<Self> {
        let id = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| DaRecogError::MissingSpecialToken(token.to_string()))
        };
        Ok(Self {
            pad_id: id(PAD_TOKEN)?,
            bos_id: id(BOS_TOKEN)?,
            eos_id: id(EOS_TOKEN)?,
            tokenizer,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    /// `<s> tokens </s>` truncated to `max_len`, then padded to `max_len`.
    pub fn encode(&self, text: &str, max_len: usize) -> Result<EncodedUtterance> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        let tokens = encoding.get_ids();

        let room = max_len.saturating_sub(2);
        let truncated = tokens.len() > room;

        let mut ids = Vec::with_capacity(max_len);
        ids.push(self.bos_id);
        ids.extend_from_slice(&tokens[..tokens.len().min(room)]);
        ids.push(self.eos_id);
        ids.truncate(max_len);
        let length = ids.len();
        ids.resize(max_len, self.pad_id);

        Ok(EncodedUtterance { ids, length, truncated })
    }

    /// An all-pad row for history slots before the dialog starts.
    pub fn padding_row(&self, max_len: usize) -> Vec<u32> {
        vec![self.pad_id; max_len]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn counts() -> Vec<(String, usize)> {
        vec![
            ("okay".to_string(), 50),
            ("yeah".to_string(), 80),
            ("uh".to_string(), 80),
            ("rare".to_string(), 1),
        ]
    }

    #[test]
    fn test_whitespace_vocab_budget() {
        let tokenizer = build_whitespace(&counts(), 8).unwrap();
        // 6 specials + the two most frequent words
        assert_eq!(tokenizer.get_vocab_size(true), 8);
        assert_eq!(tokenizer.token_to_id("uh"), Some(6));
        assert_eq!(tokenizer.token_to_id("yeah"), Some(7));
        assert_eq!(tokenizer.token_to_id("okay"), None);
    }

    #[test]
    fn test_encode_frames_and_pads() {
        let tok = UtteranceTokenizer::new(build_whitespace(&counts(), 100).unwrap()).unwrap();
        let enc = tok.encode("Yeah okay unseen", 8).unwrap();
        let unk = 1;
        assert_eq!(enc.ids.len(), 8);
        assert_eq!(enc.length, 5);
        assert!(!enc.truncated);
        assert_eq!(enc.ids[0], tok.bos_id);
        assert_eq!(enc.ids[3], unk);
        assert_eq!(enc.ids[4], tok.eos_id);
        assert!(enc.ids[5..].iter().all(|&id| id == tok.pad_id()));
    }

    #[test]
    fn test_encode_truncates() {
        let tok = UtteranceTokenizer::new(build_whitespace(&counts(), 100).unwrap()).unwrap();
        let enc = tok.encode("uh uh uh uh uh", 4).unwrap();
        assert_eq!(enc.ids.len(), 4);
        assert_eq!(enc.length, 4);
        assert!(enc.truncated);
        assert_eq!(enc.ids[3], tok.eos_id);
    }

    #[test]
    fn test_read_word_counts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "yeah 80\nuh\t80\n\nokay 50").unwrap();
        let counts = read_word_counts(file.path()).unwrap();
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[1], ("uh".to_string(), 80));
    }

    #[test]
    fn test_read_word_counts_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "yeah many").unwrap();
        assert!(read_word_counts(file.path()).is_err());
    }
}
