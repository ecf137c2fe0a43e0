use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::record::ExportRecord;

/// Append-only flight log, opened lazily the first time logging is enabled.
/// `finalize` rewrites the file without blank lines at teardown.
#[derive(Debug)]
pub struct FlightLog {
    path: PathBuf,
    file: Option<File>,
}

impl FlightLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&mut self, record: &ExportRecord) -> Result<()> {
        if self.file.is_none() {
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .with_context(|| format!("open flight log {}", self.path.display()))?;
            info!("flight log: {}", self.path.display());
            self.file = Some(f);
        }
        let mut line = record.to_csv_line();
        line.push('\n');
        let f = self.file.as_mut().unwrap();
        f.write_all(line.as_bytes()).await.context("append flight log")?;
        // tokio files write on a background task; flush so readers (and the
        // teardown rewrite) observe the line immediately
        f.flush().await.context("flush flight log")?;
        Ok(())
    }

    /// Drops the writer and strips blank lines left by interleaved appends.
    /// A log that was never opened is left untouched.
    pub async fn finalize(&mut self) -> Result<()> {
        if self.file.take().is_none() {
            return Ok(());
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read back flight log {}", self.path.display()))?;
        let mut cleaned = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if !cleaned.is_empty() {
            cleaned.push('\n');
        }
        tokio::fs::write(&self.path, cleaned)
            .await
            .context("rewrite flight log")
    }
}
