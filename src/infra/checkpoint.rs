// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores model weights for one training run.
//
// Every run gets a unique name that embeds what was trained:
//
//   {model}.floor_{floor_encoder}.seed_{seed}.{YYYYmmdd-HHMMSS}[.{note}]
//
// and its files land at
//
//   {model_dir}/{run_name}.model.bin   ← full parameter record
//   {log_dir}/{run_name}.log           ← run log (when enabled)
//
// Weights are written on every validation, always to the same
// path, so the file holds the most recent weights.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::ml::learner::Learner;

/// `chrono` format used for the run timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Unique, human-readable name of a training run.
pub fn run_name(
    model:         &str,
    floor_encoder: &str,
    seed:          u64,
    timestamp:     &str,
    note:          Option<&str>,
) -> String {
    let mut name = format!("{model}.floor_{floor_encoder}.seed_{seed}.{timestamp}");
    if let Some(note) = note.filter(|n| !n.is_empty()) {
        name.push('.');
        name.push_str(note);
    }
    name
}

pub fn log_path(log_dir: impl AsRef<Path>, run_name: &str) -> PathBuf {
    log_dir.as_ref().join(format!("{run_name}.log"))
}

/// Manages the checkpoint file of one run.
pub struct CheckpointManager {
    /// `{model_dir}/{run_name}.model.bin`
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(model_dir: impl AsRef<Path>, run_name: &str) -> Self {
        Self { path: model_dir.as_ref().join(format!("{run_name}.model.bin")) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the learner's parameter record, replacing any earlier save.
    pub fn save<L: Learner>(&self, learner: &L) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            // create_dir_all creates parent directories too, like `mkdir -p`
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create model directory '{}'", dir.display()))?;
        }
        let bytes = learner.to_bytes()?;
        fs::write(&self.path, bytes).with_context(|| {
            format!("Failed to save checkpoint to '{}'", self.path.display())
        })?;
        tracing::debug!("Saved checkpoint '{}'", self.path.display());
        Ok(())
    }

    /// Restore weights saved by an earlier run.
    pub fn load<L: Learner>(path: impl AsRef<Path>, learner: &mut L) -> Result<()> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Cannot read checkpoint '{}'", path.display()))?;
        learner
            .load_bytes(bytes)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        tracing::info!("Loaded model weights from '{}'", path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::data_source::DialogBatch;
    use crate::infra::stats_reporter::StatRecord;
    use crate::ml::learner::EvalOutput;

    /// Stores its "weights" as raw bytes.
    struct BytesLearner(Vec<u8>);

    impl Learner for BytesLearner {
        fn train_step(&mut self, _: &DialogBatch, _: f64) -> Result<StatRecord> {
            Ok(StatRecord::new())
        }
        fn evaluate_step(&self, _: &DialogBatch) -> Result<EvalOutput> {
            Ok(EvalOutput { predictions: Vec::new(), stats: StatRecord::new() })
        }
        fn to_bytes(&self) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
        fn load_bytes(&mut self, bytes: Vec<u8>) -> Result<()> {
            self.0 = bytes;
            Ok(())
        }
    }

    #[test]
    fn test_run_name_is_deterministic() {
        let a = run_name("hre", "rel", 42, "20240101-120000", None);
        assert_eq!(a, "hre.floor_rel.seed_42.20240101-120000");
        assert_eq!(a, run_name("hre", "rel", 42, "20240101-120000", None));
        assert_eq!(
            run_name("hre", "rel", 42, "20240101-120000", Some("ablation")),
            "hre.floor_rel.seed_42.20240101-120000.ablation"
        );
    }

    #[test]
    fn test_distinct_seeds_never_collide() {
        let dir = Path::new("models");
        let a = CheckpointManager::new(dir, &run_name("hre", "none", 1, "20240101-120000", None));
        let b = CheckpointManager::new(dir, &run_name("hre", "none", 11, "20240101-120000", None));
        assert_ne!(a.path(), b.path());
        assert_eq!(a.path(), Path::new("models/hre.floor_none.seed_1.20240101-120000.model.bin"));
    }

    #[test]
    fn test_log_path() {
        assert_eq!(log_path("logs", "run"), Path::new("logs/run.log"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path().join("model"), "run");
        manager.save(&BytesLearner(vec![1, 2, 3])).unwrap();

        let mut restored = BytesLearner(Vec::new());
        CheckpointManager::load(manager.path(), &mut restored).unwrap();
        assert_eq!(restored.0, vec![1, 2, 3]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let mut learner = BytesLearner(Vec::new());
        assert!(CheckpointManager::load("/nonexistent/run.model.bin", &mut learner).is_err());
    }
}
