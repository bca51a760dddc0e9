use crate::domain::{DataPoint, SendResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Append-only text log of delivered samples.
///
/// Each delivered point with a clock is written as `<clock>,<key>,<value>`.
/// A point counts as already delivered when a line starts with
/// `<clock>,<key>,`. Points without a clock are never recorded. Round
/// summaries are written as `#`-prefixed lines and never match a point.
#[derive(Debug, Clone)]
pub struct SentLedger {
    path: PathBuf,
}

impl SentLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All lines currently in the ledger; a missing file is an empty ledger.
    pub async fn lines(&self) -> Result<Vec<String>, LedgerError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn contains(&self, clock: i64, key: &str) -> Result<bool, LedgerError> {
        let prefix = entry_prefix(clock, key);
        Ok(self.lines().await?.iter().any(|line| line.starts_with(&prefix)))
    }

    /// Drops points that were already delivered, keeping the order of the rest.
    pub async fn filter_undelivered(
        &self,
        points: Vec<DataPoint>,
    ) -> Result<Vec<DataPoint>, LedgerError> {
        let lines = self.lines().await?;
        let delivered = |clock: i64, key: &str| {
            let prefix = entry_prefix(clock, key);
            lines.iter().any(|line| line.starts_with(&prefix))
        };

        let before = points.len();
        let remaining: Vec<DataPoint> = points
            .into_iter()
            .filter(|p| p.clock.is_none_or(|clock| !delivered(clock, &p.key)))
            .collect();

        debug!(
            "Ledger {} skipped {} already delivered point(s)",
            self.path.display(),
            before - remaining.len()
        );
        Ok(remaining)
    }

    pub async fn record(&self, points: &[DataPoint]) -> Result<(), LedgerError> {
        let mut buffer = String::new();
        for point in points {
            if let Some(clock) = point.clock {
                buffer.push_str(&entry_prefix(clock, &point.key));
                buffer.push_str(&point.value.replace('\n', " "));
                buffer.push('\n');
            }
        }
        self.append(&buffer).await
    }

    /// Appends one summary line for a send round.
    pub async fn append_results(&self, results: &[SendResult]) -> Result<(), LedgerError> {
        let codes: Vec<String> = results
            .iter()
            .map(|r| r.code.code().to_string())
            .collect();
        let line = format!(
            "# {} results: [{}]\n",
            chrono::Utc::now().to_rfc3339(),
            codes.join(", ")
        );
        self.append(&line).await
    }

    /// Rewrites the ledger keeping only its last `keep` lines. Returns how many
    /// lines were dropped.
    pub async fn purge(&self, keep: usize) -> Result<usize, LedgerError> {
        let lines = self.lines().await?;
        if lines.len() <= keep {
            return Ok(0);
        }

        let dropped = lines.len() - keep;
        let mut content = lines[dropped..].join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(&self.path, content).await?;

        debug!(
            "Purged {} line(s) from ledger {}",
            dropped,
            self.path.display()
        );
        Ok(dropped)
    }

    async fn append(&self, text: &str) -> Result<(), LedgerError> {
        if text.is_empty() {
            return Ok(());
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn entry_prefix(clock: i64, key: &str) -> String {
    format!("{clock},{key},")
}
