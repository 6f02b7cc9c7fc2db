//! Source feeds: ordered supplies of scraped documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use collegecms_shared::{CollegeCmsError, RawScrapedRecord, Result};
use collegecms_storage::{StagedStatus, Storage};
use serde_json::Value;
use tracing::{debug, warn};

/// One scraped document plus its opaque source-side key.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub source_key: String,
    pub record: RawScrapedRecord,
}

/// An ordered, finite supply of scraped documents.
#[async_trait]
pub trait SourceFeed: Send + Sync {
    /// Short label for logs.
    fn describe(&self) -> String;

    /// All records, in feed order.
    async fn records(&self) -> Result<Vec<SourceRecord>>;
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// A JSON file holding either one top-level array of documents or one
/// document per line (JSON Lines).
#[derive(Debug, Clone)]
pub struct JsonFileFeed {
    path: PathBuf,
}

impl JsonFileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourceFeed for JsonFileFeed {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn records(&self) -> Result<Vec<SourceRecord>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CollegeCmsError::io(&self.path, e))?;
        parse_documents(&text, &file_label(&self.path))
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Split feed text into records keyed `label#n` (1-based).
///
/// A top-level array must decode as a whole. In JSON Lines mode a line that
/// fails to decode is skipped with a warning; blank lines are ignored.
pub fn parse_documents(text: &str, label: &str) -> Result<Vec<SourceRecord>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let items: Vec<Value> = serde_json::from_str(trimmed)
            .map_err(|e| CollegeCmsError::parse(format!("{label}: {e}")))?;
        return Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, value)| SourceRecord {
                source_key: format!("{label}#{}", i + 1),
                record: RawScrapedRecord::new(value),
            })
            .collect());
    }

    let mut records = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => records.push(SourceRecord {
                source_key: format!("{label}#{}", i + 1),
                record: RawScrapedRecord::new(value),
            }),
            Err(e) => warn!(%label, line = i + 1, error = %e, "skipping undecodable line"),
        }
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Staging collection
// ---------------------------------------------------------------------------

/// Documents waiting in the staging collection, keyed by their staging id.
///
/// By default only `draft` and `failed` documents are fed; `include_migrated`
/// re-feeds everything.
pub struct StagingFeed {
    storage: Arc<Storage>,
    include_migrated: bool,
}

impl StagingFeed {
    pub fn new(storage: Arc<Storage>, include_migrated: bool) -> Self {
        Self {
            storage,
            include_migrated,
        }
    }
}

#[async_trait]
impl SourceFeed for StagingFeed {
    fn describe(&self) -> String {
        if self.include_migrated {
            "staging (all)".into()
        } else {
            "staging (pending)".into()
        }
    }

    async fn records(&self) -> Result<Vec<SourceRecord>> {
        let staged = self.storage.list_staged(None).await?;
        let total = staged.len();
        let records: Vec<SourceRecord> = staged
            .into_iter()
            .filter(|s| self.include_migrated || s.status != StagedStatus::Migrated)
            .map(|s| SourceRecord {
                source_key: s.id,
                record: s.document,
            })
            .collect();
        debug!(total, pending = records.len(), "loaded staging feed");
        Ok(records)
    }
}
