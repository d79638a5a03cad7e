// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// From the dataset JSON to device tensors:
//
//   CorpusConfig   → where the dataset lives, label set, floors
//       │
//       ▼
//   DataSource     → tokenised examples, epoch_init / next
//       │
//       ▼
//   DialogBatcher  → DialogBatch → tensors on the model device
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Per-corpus paths and label vocabularies
pub mod corpus;

/// Example construction and batch iteration for one split
pub mod data_source;

/// Plain batches to burn tensors
pub mod batcher;
