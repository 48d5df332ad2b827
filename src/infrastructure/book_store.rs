//! Durable record store: append-only JSONL log plus UPC dedup index
//!
//! The store owns the only shared mutable state of the parser service. One
//! mutex guards both the set of accepted UPCs and the log file handle, so the
//! duplicate check and the append are a single critical section: two
//! concurrent requests carrying the same UPC can never both append.
//!
//! Membership in the index always implies a line committed to disk. An
//! append that fails leaves the index untouched, and the index is rebuilt
//! from the log on startup, so a crash between requests loses nothing.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::book::ParsedBook;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of the atomic acceptance step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The record was appended to the log and its UPC indexed.
    Accepted,
    /// The UPC was already present; nothing was written.
    Duplicate,
}

/// Append-only record store with an in-memory dedup index.
pub struct BookStore {
    path: PathBuf,
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    seen: HashSet<String>,
    file: File,
}

impl BookStore {
    /// Open the store, replaying an existing log into the dedup index.
    ///
    /// Malformed lines are skipped with a warning; they never prevent
    /// startup. The parent directory is created if missing.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let seen = match File::open(path).await {
            Ok(existing) => bootstrap_index(existing, path).await?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        info!(
            records = seen.len(),
            path = %path.display(),
            "book store ready"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(StoreInner { seen, file }),
        })
    }

    /// Whether a UPC has already been accepted.
    pub async fn contains(&self, upc: &str) -> bool {
        self.inner.lock().await.seen.contains(upc)
    }

    /// Number of accepted records.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.seen.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomic acceptance step: check the index, append the record line and
    /// flush it to stable storage, then index the UPC.
    ///
    /// The index is only mutated after the line is committed; a write or
    /// flush failure surfaces as [`StoreError`] and leaves the store exactly
    /// as it was.
    pub async fn accept(&self, book: &ParsedBook) -> Result<AcceptOutcome, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.seen.contains(&book.upc) {
            return Ok(AcceptOutcome::Duplicate);
        }

        let mut line = serde_json::to_string(book)?;
        line.push('\n');

        inner.file.write_all(line.as_bytes()).await?;
        inner.file.sync_data().await?;

        inner.seen.insert(book.upc.clone());
        debug!(upc = %book.upc, "record committed to log");
        Ok(AcceptOutcome::Accepted)
    }
}

/// Scan the existing log line by line and collect the UPCs of well-formed
/// records.
async fn bootstrap_index(file: File, path: &Path) -> Result<HashSet<String>, StoreError> {
    let mut seen = HashSet::new();
    let mut lines = BufReader::new(file).lines();
    let mut line_number = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(record) => match record.get("UPC").and_then(|v| v.as_str()) {
                Some(upc) => {
                    seen.insert(upc.to_string());
                }
                None => {
                    warn!(line = line_number, path = %path.display(), "log line has no UPC, skipping");
                }
            },
            Err(e) => {
                warn!(line = line_number, path = %path.display(), error = %e, "malformed log line, skipping");
            }
        }
    }

    Ok(seen)
}
