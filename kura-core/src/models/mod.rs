pub mod cluster;
pub mod conversation;
pub mod metadata;
pub mod summary;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use cluster::{ClusterRecord, ClusterTreeNode, ROOT_ID, ROOT_NAME};
pub use conversation::{ConversationInfo, ConversationRecord, Message};
pub use metadata::{Metadata, MetadataValue, Scalar};
pub use summary::SummaryRecord;

/// The three record shapes a checkpoint directory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Conversation,
    Summary,
    Cluster,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Conversation => "conversation",
            RecordKind::Summary => "summary",
            RecordKind::Cluster => "cluster",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated batch from one checkpoint file.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Conversations(Vec<ConversationRecord>),
    Summaries(Vec<SummaryRecord>),
    Clusters(Vec<ClusterRecord>),
}

impl Dataset {
    pub fn kind(&self) -> RecordKind {
        match self {
            Dataset::Conversations(_) => RecordKind::Conversation,
            Dataset::Summaries(_) => RecordKind::Summary,
            Dataset::Clusters(_) => RecordKind::Cluster,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dataset::Conversations(v) => v.len(),
            Dataset::Summaries(v) => v.len(),
            Dataset::Clusters(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
