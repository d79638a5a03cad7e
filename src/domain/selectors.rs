// ============================================================
// Layer 3 - Closed Selectors
// ============================================================
// The CLI names models, tokenizers and encoder variants with
// strings. Each string selector maps onto a closed enum here,
// and an unknown value fails before any data is read.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DaRecogError;

/// Implements `FromStr` + `Display` over a fixed tag table.
macro_rules! selector {
    ($name:ident, $kind:literal, { $($variant:ident => $tag:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = DaRecogError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok(Self::$variant),)+
                    other => Err(DaRecogError::UnknownSelector {
                        kind:     $kind,
                        value:    other.to_string(),
                        expected: concat!($($tag, " "),+),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Model architecture family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Hre,
    HreSepUttrEnc,
    Transformer,
}

selector!(ModelKind, "model", {
    Hre => "hre",
    HreSepUttrEnc => "hre_sep_uttr_enc",
    Transformer => "roberta",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerKind {
    Whitespace,
    Roberta,
}

selector!(TokenizerKind, "tokenizer", {
    Whitespace => "ws",
    Roberta => "roberta",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RnnType {
    Gru,
    Lstm,
}

selector!(RnnType, "rnn type", {
    Gru => "gru",
    Lstm => "lstm",
});

/// How speaker turns are fed to the dialog encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloorEncoding {
    /// No speaker information
    None,
    /// Same speaker as the target utterance or not
    Relative,
    /// Speaker id of each utterance
    Absolute,
}

selector!(FloorEncoding, "floor encoder", {
    None => "none",
    Relative => "rel",
    Absolute => "abs",
});

/// Transformer classifier size presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSize {
    Base,
    Large,
    LargeMnli,
}

selector!(ModelSize, "model size", {
    Base => "base",
    Large => "large",
    LargeMnli => "large-mnli",
});

/// `d_model`, heads, layers, `d_ff`
pub struct TransformerShape {
    pub d_model:    usize,
    pub num_heads:  usize,
    pub num_layers: usize,
    pub d_ff:       usize,
}

impl ModelSize {
    pub fn shape(&self) -> TransformerShape {
        match self {
            Self::Base => TransformerShape { d_model: 768, num_heads: 12, num_layers: 12, d_ff: 3072 },
            Self::Large | Self::LargeMnli => TransformerShape { d_model: 1024, num_heads: 16, num_layers: 24, d_ff: 4096 },
        }
    }
}

/// Both tags build AdamW; `adam` is kept for command-line compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Adam,
    AdamW,
}

selector!(OptimizerKind, "optimizer", {
    Adam => "adam",
    AdamW => "adamw",
});

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tags_round_trip() {
        assert_eq!("hre_sep_uttr_enc".parse::<ModelKind>(), Ok(ModelKind::HreSepUttrEnc));
        assert_eq!("roberta".parse::<ModelKind>(), Ok(ModelKind::Transformer));
        assert_eq!("rel".parse::<FloorEncoding>(), Ok(FloorEncoding::Relative));
        assert_eq!(FloorEncoding::Absolute.to_string(), "abs");
        assert_eq!("large-mnli".parse::<ModelSize>(), Ok(ModelSize::LargeMnli));
    }

    #[test]
    fn test_unknown_tag_fails() {
        let err = "bert".parse::<ModelKind>().unwrap_err();
        assert!(matches!(
            err,
            DaRecogError::UnknownSelector { kind: "model", ref value, .. } if value == "bert"
        ));
        assert!("rnn".parse::<RnnType>().is_err());
        assert!("sgd".parse::<OptimizerKind>().is_err());
    }
}
