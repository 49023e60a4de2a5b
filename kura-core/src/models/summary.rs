use serde::{Deserialize, Serialize};

/// One line of `summaries.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub chat_id: String,
    pub summary: String,
    /// Remaining producer fields (request, task, metadata, ...), kept as written.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
