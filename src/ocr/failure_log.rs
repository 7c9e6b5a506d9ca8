//! Append-only log of OCR failures for operator review.

use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// One `filename | error | timestamp` line per failed image.
#[derive(Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one failure line. Errors are surfaced to the caller, which
    /// logs and continues; a broken failure log never fails a task twice.
    pub async fn append(&self, filename: &str, error: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Operators read this file directly, so the timestamp is local
        // wall-clock time rather than UTC.
        let line = format!(
            "{} | {} | {}\n",
            filename,
            error,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;

        Ok(())
    }
}
