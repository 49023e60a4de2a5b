use std::fmt;
use thiserror::Error;

use crate::models::RecordKind;

#[derive(Error, Debug)]
pub enum KuraError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

// ============================================================================
// Validation
// ============================================================================

/// One failed check inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Position of the record in the batch (0-based).
    pub record: usize,
    /// Dotted field path, e.g. `messages[2].role`. Empty for the record itself.
    pub field: String,
    pub problem: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "record {}: {}", self.record, self.problem)
        } else {
            write!(f, "record {}: `{}` {}", self.record, self.field, self.problem)
        }
    }
}

/// A rejected batch. Carries every issue found, not just the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} batch rejected: {} invalid field(s), first: {}", .issues.len(), first_issue(.issues))]
pub struct ValidationError {
    pub kind: RecordKind,
    pub issues: Vec<ValidationIssue>,
}

fn first_issue(issues: &[ValidationIssue]) -> String {
    issues
        .first()
        .map(|i| i.to_string())
        .unwrap_or_else(|| "none".to_string())
}

// ============================================================================
// Ingestion
// ============================================================================

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognised checkpoint file: {0}")]
    UnknownFile(String),

    #[error("File is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Malformed JSON document: {0}")]
    Document(#[source] serde_json::Error),

    #[error("Expected a JSON array of records")]
    NotAnArray,

    #[error("Malformed JSON on line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ============================================================================
// Tree construction
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Duplicate cluster id: {0}")]
    DuplicateId(String),

    #[error("Cluster hierarchy contains a cycle through {0}")]
    Cycle(String),

    #[error("Cluster {id} references missing parent {parent_id}")]
    DanglingParent { id: String, parent_id: String },
}

// ============================================================================
// Joins
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("No summary found for conversation {chat_id}")]
    MissingSummary { chat_id: String },
}

// ============================================================================
// Session
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Checkpoint incomplete, missing: {}", .0.join(", "))]
    NotReady(Vec<&'static str>),

    #[error("Clusters have not been visualised yet")]
    NoView,

    #[error("Unknown cluster: {0}")]
    UnknownCluster(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Join(#[from] JoinError),
}
