//! Conversation joins and metadata aggregation for a selected cluster

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::JoinError;
use crate::models::{ConversationInfo, ConversationRecord, MetadataValue, SummaryRecord};

/// How array-valued metadata is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Each array element is its own token.
    #[default]
    Individual,
    /// The whole array is one token, elements joined with `", "`.
    List,
}

/// Join every conversation with its summary, keyed by `chat_id`.
///
/// The first summary for a `chat_id` wins. A conversation without one, or
/// whose first summary is empty, fails the whole join.
pub fn build_conversation_map(
    conversations: &[ConversationRecord],
    summaries: &[SummaryRecord],
) -> Result<HashMap<String, ConversationInfo>, JoinError> {
    let mut by_chat: HashMap<&str, &str> = HashMap::with_capacity(summaries.len());
    for summary in summaries {
        by_chat
            .entry(summary.chat_id.as_str())
            .or_insert(summary.summary.as_str());
    }

    let mut map = HashMap::with_capacity(conversations.len());
    for conversation in conversations {
        let summary = by_chat
            .get(conversation.chat_id.as_str())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| JoinError::MissingSummary {
                chat_id: conversation.chat_id.clone(),
            })?;
        map.insert(
            conversation.chat_id.clone(),
            ConversationInfo {
                conversation: conversation.clone(),
                summary: summary.to_string(),
            },
        );
    }
    Ok(map)
}

/// Resolve chat ids in order, silently skipping unknown ones.
pub fn join_conversations<'a>(
    chat_ids: &[String],
    map: &'a HashMap<String, ConversationInfo>,
) -> Vec<&'a ConversationInfo> {
    chat_ids.iter().filter_map(|id| map.get(id)).collect()
}

/// Per metadata key, how often each value token occurs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSummary {
    pub mode: AggregationMode,
    pub counts: BTreeMap<String, BTreeMap<String, usize>>,
}

impl MetadataSummary {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, key: &str, token: &str) -> usize {
        self.counts
            .get(key)
            .and_then(|tokens| tokens.get(token))
            .copied()
            .unwrap_or(0)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Tokens for `key`, most frequent first; ties by token.
    pub fn ranked(&self, key: &str) -> Vec<(&str, usize)> {
        let mut tokens: Vec<(&str, usize)> = self
            .counts
            .get(key)
            .map(|t| t.iter().map(|(token, n)| (token.as_str(), *n)).collect())
            .unwrap_or_default();
        tokens.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        tokens
    }
}

/// Count metadata values across conversations.
pub fn aggregate_metadata<'a, I>(conversations: I, mode: AggregationMode) -> MetadataSummary
where
    I: IntoIterator<Item = &'a ConversationInfo>,
{
    let mut summary = MetadataSummary {
        mode,
        counts: BTreeMap::new(),
    };

    for info in conversations {
        for (key, value) in info.metadata() {
            let tokens = summary.counts.entry(key.clone()).or_default();
            match (value, mode) {
                (MetadataValue::List(items), AggregationMode::Individual) => {
                    for item in items {
                        *tokens.entry(item.to_string()).or_insert(0) += 1;
                    }
                }
                (value, _) => {
                    *tokens.entry(value.joined_token()).or_insert(0) += 1;
                }
            }
        }
    }

    summary
}
