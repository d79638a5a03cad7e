// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong in any specific
// business layer:
//
//   checkpoint.rs      - run names and the weights file
//   tokenizer_store.rs - whitespace / pretrained tokenizers
//   metrics.rs         - classification report and F1 scores
//   stats_reporter.rs  - running means of step statistics
//   run_log.rs         - stdout + optional log file
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Run naming and model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building and loading
pub mod tokenizer_store;

/// Classification metrics
pub mod metrics;

/// Step statistics accumulator
pub mod stats_reporter;

/// Run output sink
pub mod run_log;
