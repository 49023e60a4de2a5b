//! Kura checkpoint pipeline
//!
//! Loads the files a Kura clustering run leaves behind, validates them, and
//! rebuilds the cluster hierarchy for display:
//!
//! ```text
//! conversations.json ─┐
//! summaries.jsonl ────┼─> ingest ─> validate ─> session
//! dimensionality.jsonl┘                           │
//!                          tree::build_tree <─────┤
//!                          tree::flatten_tree     │
//!                          aggregate (on select) <┘
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod session;
pub mod tree;
pub mod validate;

pub use aggregate::{AggregationMode, MetadataSummary};
pub use config::KuraConfig;
pub use error::{IngestError, JoinError, KuraError, SessionError, TreeError, ValidationError};
pub use ingest::FileKind;
pub use models::{
    ClusterRecord, ClusterTreeNode, ConversationInfo, ConversationRecord, Dataset, MetadataValue,
    RecordKind, SummaryRecord,
};
pub use session::{ClusterDetails, ClusterView, ExplorerSession, SessionConfig};
pub use tree::{FlatClusterNode, OrphanPolicy};
