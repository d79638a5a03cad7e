// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a training run.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination and configuration merging
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// CLI + corpus configuration merging
pub mod config;

// The training workflow
pub mod train_use_case;
