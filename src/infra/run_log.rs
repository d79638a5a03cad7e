// ============================================================
// Layer 6 - Run Log
// ============================================================
// Run output (statistics, hyper-parameters, loss checks,
// evaluation reports) is printed to stdout and, when logging
// is enabled, appended line by line to `{log_dir}/{run_name}.log`.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub struct RunLog {
    /// `None` when file logging is disabled
    path: Option<PathBuf>,
}

impl RunLog {
    /// Log to stdout and to `path`, creating its directory.
    pub fn to_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;
        }
        tracing::debug!("Writing run log to '{}'", path.display());
        Ok(Self { path: Some(path) })
    }

    /// Log to stdout only.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn log(&self, message: impl AsRef<str>) -> Result<()> {
        let message = message.as_ref();
        println!("{message}");

        if let Some(path) = &self.path {
            // Open in append mode - adds to end of file
            let mut f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file '{}'", path.display()))?;
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("run.log");
        let log = RunLog::to_file(&path).unwrap();
        log.log("first").unwrap();
        log.log(format!("second {}", 2)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond 2\n");
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let log = RunLog::disabled();
        assert!(log.path().is_none());
        log.log("only stdout").unwrap();
    }
}
