// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. There is a single run
// mode: parse the flags, hand them to the training use case.
// All work is delegated to Layer 2 (application).
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::TrainArgs;

/// Top-level parser; the run flags are flattened in so there
/// are no subcommands.
#[derive(Parser, Debug)]
#[command(
    name = "da-recog",
    version = "0.1.0",
    about = "Train and evaluate dialogue-act recognition models."
)]
pub struct Cli {
    #[command(flatten)]
    pub args: TrainArgs,
}

impl Cli {
    /// Resolve the configuration and run training.
    pub fn run(self) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!(
            "Starting {} training on corpus '{}'",
            self.args.model,
            self.args.corpus
        );

        let use_case = TrainUseCase::from_args(self.args)?;
        let summary = use_case.execute()?;

        tracing::info!(
            "Training stopped ({}) after {} epoch(s), {} step(s)",
            summary.stop_reason,
            summary.epochs_started,
            summary.n_step
        );
        Ok(())
    }
}
