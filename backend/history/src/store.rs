use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use chatrelay_core::{RelayError, Turn};

/// On-disk shape of the history log.
#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    history: Vec<Turn>,
}

/// Append-only JSON log of recorded conversation turns.
///
/// A missing or unparsable file is treated as an empty log, never as a
/// fatal error: a corrupt log must not take the service down.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all recorded turns, oldest first.
    pub async fn load(&self) -> Vec<Turn> {
        self.read_file().await.history
    }

    /// Append one turn and rewrite the log.
    ///
    /// The write goes to a temp file first and is renamed into place, so a
    /// reader never observes a partially written log. A write failure is
    /// returned as recoverable: the turn stays in the caller's in-memory
    /// transcript even though it was not made durable.
    pub async fn append(&self, turn: Turn) -> Result<(), RelayError> {
        let mut file = self.read_file().await;
        file.history.push(turn);
        self.write_file(&file)
            .await
            .map_err(|e| RelayError::History(format!("{e:#}")))
    }

    async fn read_file(&self) -> HistoryFile {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "History file does not exist; starting empty");
            return HistoryFile::default();
        }

        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read history file; treating as empty");
                return HistoryFile::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "History file is not valid JSON; treating as empty");
                HistoryFile::default()
            }
        }
    }

    async fn write_file(&self, file: &HistoryFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create history directory: {}", parent.display())
                })?;
            }
        }

        let json = to_pretty_json(file)?;

        // Write to temp file, then rename for atomicity.
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json.as_bytes())
            .await
            .with_context(|| format!("Failed to write temp history file: {}", tmp_path.display()))?;

        fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to rename temp history file to: {}", self.path.display()))?;

        debug!(path = %self.path.display(), entries = file.history.len(), "Wrote history file");
        Ok(())
    }
}

/// Serialize with four-space indentation so the log stays human-diffable.
fn to_pretty_json(file: &HistoryFile) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    file.serialize(&mut ser)
        .context("Failed to serialize history")?;
    String::from_utf8(buf).context("History serialized to invalid UTF-8")
}
