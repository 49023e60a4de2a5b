//! Checkpoint file ingestion
//!
//! A checkpoint directory holds three files, recognised by exact name:
//! - `conversations.json`   — one JSON array of conversations
//! - `summaries.jsonl`      — one summary per non-blank line
//! - `dimensionality.jsonl` — one projected cluster per non-blank line
//!
//! Each file is decoded, then handed to the validator. Any decode or
//! validation failure rejects the whole file; callers get a `Result`, never a
//! panic.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use serde_json::Value;

use crate::error::IngestError;
use crate::models::{Dataset, RecordKind};
use crate::validate;

pub const CONVERSATIONS_FILE: &str = "conversations.json";
pub const SUMMARIES_FILE: &str = "summaries.jsonl";
pub const CLUSTERS_FILE: &str = "dimensionality.jsonl";

/// Input file classification by filename convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Conversations,
    Summaries,
    Clusters,
}

impl FileKind {
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            CONVERSATIONS_FILE => Some(FileKind::Conversations),
            SUMMARIES_FILE => Some(FileKind::Summaries),
            CLUSTERS_FILE => Some(FileKind::Clusters),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(Self::from_file_name)
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            FileKind::Conversations => CONVERSATIONS_FILE,
            FileKind::Summaries => SUMMARIES_FILE,
            FileKind::Clusters => CLUSTERS_FILE,
        }
    }

    pub fn record_kind(&self) -> RecordKind {
        match self {
            FileKind::Conversations => RecordKind::Conversation,
            FileKind::Summaries => RecordKind::Summary,
            FileKind::Clusters => RecordKind::Cluster,
        }
    }

    /// Newline-delimited JSON rather than a single document.
    pub fn is_line_delimited(&self) -> bool {
        !matches!(self, FileKind::Conversations)
    }

    pub const ALL: [FileKind; 3] = [FileKind::Conversations, FileKind::Summaries, FileKind::Clusters];
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode a whole document that must be a JSON array.
pub fn decode_json_array(text: &str) -> Result<Vec<Value>, IngestError> {
    match serde_json::from_str::<Value>(text).map_err(IngestError::Document)? {
        Value::Array(items) => Ok(items),
        _ => Err(IngestError::NotAnArray),
    }
}

/// Decode newline-delimited JSON, skipping blank lines.
///
/// Line numbers in errors are 1-based physical lines.
pub fn decode_json_lines(text: &str) -> Result<Vec<Value>, IngestError> {
    let mut values = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(line).map_err(|source| IngestError::Line {
            line: index + 1,
            source,
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Decode and validate the text content of a checkpoint file. A leading
/// byte-order mark is ignored.
pub fn parse_text(kind: FileKind, text: &str) -> Result<Dataset, IngestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let raw = if kind.is_line_delimited() {
        decode_json_lines(text)?
    } else {
        decode_json_array(text)?
    };
    tracing::debug!("Decoded {} raw record(s) from {}", raw.len(), kind.file_name());

    let dataset = validate::validate(kind.record_kind(), &raw)?;
    Ok(dataset)
}

/// Same as [`parse_text`] for raw bytes; rejects invalid UTF-8.
pub fn parse_bytes(kind: FileKind, bytes: &[u8]) -> Result<Dataset, IngestError> {
    let text = std::str::from_utf8(bytes)?;
    parse_text(kind, text)
}

// ============================================================================
// Files
// ============================================================================

/// Read and ingest one checkpoint file. The kind comes from the filename.
pub async fn ingest_file(path: &Path) -> Result<Dataset, IngestError> {
    let kind = FileKind::from_path(path)
        .ok_or_else(|| IngestError::UnknownFile(path.display().to_string()))?;

    let bytes = tokio::fs::read(path).await.map_err(|source| IngestError::Read {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!("Parsing {} ({} bytes)", kind.file_name(), bytes.len());

    match parse_bytes(kind, &bytes) {
        Ok(dataset) => {
            tracing::info!("Loaded {} {} record(s) from {}", dataset.len(), dataset.kind(), kind.file_name());
            Ok(dataset)
        }
        Err(e) => {
            tracing::error!("Failed to ingest {}: {}", path.display(), e);
            Err(e)
        }
    }
}

/// Ingest a batch of files. Unrecognised names are skipped.
///
/// Files are read concurrently on the calling task; results keep input order.
pub async fn ingest_files(paths: &[PathBuf]) -> Vec<(PathBuf, Result<Dataset, IngestError>)> {
    let recognised: Vec<&PathBuf> = paths
        .iter()
        .filter(|path| {
            let known = FileKind::from_path(path).is_some();
            if !known {
                tracing::debug!("Skipping unrecognised file {}", path.display());
            }
            known
        })
        .collect();

    let results = join_all(recognised.iter().map(|path| ingest_file(path))).await;
    recognised.into_iter().cloned().zip(results).collect()
}

/// Ingest the three conventional files of a checkpoint directory.
pub async fn ingest_dir(dir: &Path) -> Vec<(PathBuf, Result<Dataset, IngestError>)> {
    let paths: Vec<PathBuf> = FileKind::ALL
        .iter()
        .map(|kind| dir.join(kind.file_name()))
        .collect();
    ingest_files(&paths).await
}
