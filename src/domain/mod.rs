// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs and enums describing dialogs and the
// closed sets of run options.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO tokenisation
//   - Only the concepts the other layers share
//
// Reference: Rust Book §5 (Structs), §6 (Enums)

/// Utterances, dialogs and the train/dev/test corpus
pub mod dialog;

/// String selectors parsed into closed enums
pub mod selectors;
