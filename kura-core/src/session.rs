//! Explorer session state
//!
//! A session owns the three loaded datasets and, once visualised, the derived
//! view (conversation map, cluster tree, flattened nodes). State is swapped
//! wholesale: loading a dataset replaces the previous one and discards any
//! view built from it; a file that fails to load leaves earlier data intact.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::aggregate::{
    aggregate_metadata, build_conversation_map, join_conversations, AggregationMode,
    MetadataSummary,
};
use crate::config::KuraConfig;
use crate::error::{IngestError, SessionError};
use crate::ingest;
use crate::models::{
    ClusterRecord, ClusterTreeNode, ConversationInfo, ConversationRecord, Dataset, SummaryRecord,
};
use crate::tree::{build_tree, flatten_owned, nodes_at_level, FlatClusterNode, OrphanPolicy};

pub type SelectCallback = Box<dyn Fn(&ClusterTreeNode) + Send + Sync>;
pub type ResetCallback = Box<dyn Fn() + Send + Sync>;

/// Settings a session needs from the wider configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    pub orphan_policy: OrphanPolicy,
    pub aggregation_mode: AggregationMode,
}

impl From<&KuraConfig> for SessionConfig {
    fn from(config: &KuraConfig) -> Self {
        Self {
            orphan_policy: config.tree.orphan_policy,
            aggregation_mode: config.display.aggregation_mode,
        }
    }
}

/// Everything derived by [`ExplorerSession::visualize`].
#[derive(Debug, Clone)]
pub struct ClusterView {
    conversations: HashMap<String, ConversationInfo>,
    tree: ClusterTreeNode,
    flat: Vec<FlatClusterNode>,
}

impl ClusterView {
    pub fn tree(&self) -> &ClusterTreeNode {
        &self.tree
    }

    /// Pre-order nodes, synthetic root first.
    pub fn flat(&self) -> &[FlatClusterNode] {
        &self.flat
    }

    pub fn conversations(&self) -> &HashMap<String, ConversationInfo> {
        &self.conversations
    }

    pub fn conversation(&self, chat_id: &str) -> Option<&ConversationInfo> {
        self.conversations.get(chat_id)
    }

    pub fn clusters_at_level(&self, level: usize) -> Vec<&FlatClusterNode> {
        nodes_at_level(&self.flat, level)
    }

    /// A real cluster by id. The synthetic root is not selectable.
    pub fn node(&self, id: &str) -> Option<&ClusterTreeNode> {
        self.tree.children.iter().find_map(|child| child.find(id))
    }

    pub fn details<'a>(&'a self, node: &'a ClusterTreeNode, mode: AggregationMode) -> ClusterDetails<'a> {
        let conversations = join_conversations(&node.chat_ids, &self.conversations);
        let metadata = aggregate_metadata(conversations.iter().copied(), mode);
        ClusterDetails {
            cluster: node,
            conversations,
            metadata,
        }
    }
}

/// What the display layer shows for a selected cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterDetails<'a> {
    pub cluster: &'a ClusterTreeNode,
    pub conversations: Vec<&'a ConversationInfo>,
    pub metadata: MetadataSummary,
}

/// Dataset counts for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub conversations: Option<usize>,
    pub summaries: Option<usize>,
    pub clusters: Option<usize>,
    pub visualized: bool,
}

#[derive(Default)]
pub struct ExplorerSession {
    config: SessionConfig,
    conversations: Option<Vec<ConversationRecord>>,
    summaries: Option<Vec<SummaryRecord>>,
    clusters: Option<Vec<ClusterRecord>>,
    view: Option<ClusterView>,
    selected: Option<String>,
    on_select: Option<SelectCallback>,
    on_reset: Option<ResetCallback>,
}

impl ExplorerSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn on_select(&mut self, callback: impl Fn(&ClusterTreeNode) + Send + Sync + 'static) {
        self.on_select = Some(Box::new(callback));
    }

    pub fn on_reset(&mut self, callback: impl Fn() + Send + Sync + 'static) {
        self.on_reset = Some(Box::new(callback));
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace the dataset of the same kind.
    pub fn load(&mut self, dataset: Dataset) {
        match dataset {
            Dataset::Conversations(v) => self.conversations = Some(v),
            Dataset::Summaries(v) => self.summaries = Some(v),
            Dataset::Clusters(v) => self.clusters = Some(v),
        }
        self.view = None;
        self.selected = None;
    }

    /// Ingest a batch of files. Each success replaces its dataset; failures
    /// are reported per file and leave prior data untouched.
    pub async fn load_files(&mut self, paths: &[PathBuf]) -> Vec<(PathBuf, Result<usize, IngestError>)> {
        let results = ingest::ingest_files(paths).await;
        results
            .into_iter()
            .map(|(path, result)| {
                let outcome = result.map(|dataset| {
                    let n = dataset.len();
                    self.load(dataset);
                    n
                });
                (path, outcome)
            })
            .collect()
    }

    /// All three datasets are present.
    pub fn is_ready(&self) -> bool {
        self.conversations.is_some() && self.summaries.is_some() && self.clusters.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            conversations: self.conversations.as_ref().map(Vec::len),
            summaries: self.summaries.as_ref().map(Vec::len),
            clusters: self.clusters.as_ref().map(Vec::len),
            visualized: self.view.is_some(),
        }
    }

    fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.conversations.is_none() {
            missing.push(ingest::CONVERSATIONS_FILE);
        }
        if self.summaries.is_none() {
            missing.push(ingest::SUMMARIES_FILE);
        }
        if self.clusters.is_none() {
            missing.push(ingest::CLUSTERS_FILE);
        }
        missing
    }

    // ========================================================================
    // Viewing
    // ========================================================================

    /// Build the conversation map, tree, and flat node list. Any failure
    /// leaves the session without a view.
    pub fn visualize(&mut self) -> Result<&ClusterView, SessionError> {
        self.view = None;
        self.selected = None;

        let (Some(conversations), Some(summaries), Some(clusters)) =
            (&self.conversations, &self.summaries, &self.clusters)
        else {
            return Err(SessionError::NotReady(self.missing()));
        };

        let conversation_map = build_conversation_map(conversations, summaries)?;
        let tree = build_tree(clusters, self.config.orphan_policy)?;
        let flat = flatten_owned(&tree);
        tracing::info!(
            "Visualised {} clusters ({} top-level) over {} conversations",
            flat.len() - 1,
            tree.children.len(),
            conversation_map.len()
        );

        Ok(self.view.insert(ClusterView {
            conversations: conversation_map,
            tree,
            flat,
        }))
    }

    pub fn view(&self) -> Option<&ClusterView> {
        self.view.as_ref()
    }

    /// Select a cluster: notify the select callback and return its details.
    pub fn select(&mut self, cluster_id: &str) -> Result<ClusterDetails<'_>, SessionError> {
        let mode = self.config.aggregation_mode;
        self.select_with_mode(cluster_id, mode)
    }

    /// [`select`](Self::select) with an explicit aggregation mode.
    pub fn select_with_mode(
        &mut self,
        cluster_id: &str,
        mode: AggregationMode,
    ) -> Result<ClusterDetails<'_>, SessionError> {
        let view = self.view.as_ref().ok_or(SessionError::NoView)?;
        if view.node(cluster_id).is_none() {
            return Err(SessionError::UnknownCluster(cluster_id.to_string()));
        }
        self.selected = Some(cluster_id.to_string());

        let view = self.view.as_ref().ok_or(SessionError::NoView)?;
        let node = view
            .node(cluster_id)
            .ok_or_else(|| SessionError::UnknownCluster(cluster_id.to_string()))?;
        if let Some(callback) = &self.on_select {
            callback(node);
        }
        Ok(view.details(node, mode))
    }

    pub fn selected(&self) -> Option<&ClusterTreeNode> {
        let id = self.selected.as_deref()?;
        self.view.as_ref()?.node(id)
    }

    /// Peers of the selected cluster, as plotted on the map.
    pub fn selected_level_clusters(&self) -> Vec<&FlatClusterNode> {
        match (self.selected(), &self.view) {
            (Some(node), Some(view)) => view.clusters_at_level(node.level),
            _ => Vec::new(),
        }
    }

    /// Drop every dataset and the view.
    pub fn reset(&mut self) {
        self.conversations = None;
        self.summaries = None;
        self.clusters = None;
        self.view = None;
        self.selected = None;
        if let Some(callback) = &self.on_reset {
            callback();
        }
        tracing::debug!("Session reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{JoinError, TreeError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn conversations() -> Dataset {
        Dataset::Conversations(vec![
            serde_json::from_value(json!({"chat_id": "c1", "metadata": {"tags": ["a", "b"]}})).unwrap(),
            serde_json::from_value(json!({"chat_id": "c2", "metadata": {"tags": ["a", "b"]}})).unwrap(),
            serde_json::from_value(json!({"chat_id": "c3", "metadata": {"tags": ["c"]}})).unwrap(),
        ])
    }

    fn summaries() -> Dataset {
        Dataset::Summaries(
            ["c1", "c2", "c3"]
                .iter()
                .map(|id| serde_json::from_value(json!({"chat_id": id, "summary": format!("about {}", id)})).unwrap())
                .collect(),
        )
    }

    fn cluster(id: &str, parent: Option<&str>, chat_ids: &[&str]) -> ClusterRecord {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("Cluster {}", id),
            "description": "d",
            "parent_id": parent,
            "chat_ids": chat_ids,
            "x_coord": 0.0,
            "y_coord": 0.0,
            "count": chat_ids.len()
        }))
        .unwrap()
    }

    fn clusters() -> Dataset {
        Dataset::Clusters(vec![
            cluster("1", None, &["c1", "c2", "c3"]),
            cluster("2", Some("1"), &["c1", "c2", "ghost"]),
            cluster("3", Some("1"), &["c3"]),
            cluster("4", None, &[]),
        ])
    }

    fn ready_session() -> ExplorerSession {
        let mut session = ExplorerSession::default();
        session.load(conversations());
        session.load(summaries());
        session.load(clusters());
        session
    }

    #[test]
    fn test_not_ready_lists_missing_files() {
        let mut session = ExplorerSession::default();
        session.load(summaries());
        assert!(!session.is_ready());

        match session.visualize() {
            Err(SessionError::NotReady(missing)) => {
                assert_eq!(missing, vec!["conversations.json", "dimensionality.jsonl"]);
            }
            other => panic!("expected NotReady, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_visualize_builds_view() {
        let mut session = ready_session();
        let view = session.visualize().unwrap();

        assert_eq!(view.tree().children.len(), 2);
        assert_eq!(view.flat().len(), 5);
        assert_eq!(view.conversations().len(), 3);
        assert_eq!(view.conversation("c2").unwrap().summary, "about c2");

        let level_two: Vec<&str> = view.clusters_at_level(2).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(level_two, vec!["2", "3"]);
        assert!(session.status().visualized);
    }

    #[test]
    fn test_missing_summary_aborts_view() {
        let mut session = ready_session();
        session.load(Dataset::Summaries(vec![
            serde_json::from_value(json!({"chat_id": "c1", "summary": "x"})).unwrap(),
        ]));

        let err = session.visualize().unwrap_err();
        assert_eq!(
            err,
            SessionError::Join(JoinError::MissingSummary { chat_id: "c2".to_string() })
        );
        assert!(session.view().is_none());
    }

    #[test]
    fn test_tree_failure_aborts_view() {
        let mut session = ready_session();
        session.load(Dataset::Clusters(vec![cluster("1", None, &[]), cluster("1", None, &[])]));

        assert_eq!(
            session.visualize().unwrap_err(),
            SessionError::Tree(TreeError::DuplicateId("1".to_string()))
        );
        assert!(session.view().is_none());
    }

    #[test]
    fn test_select_aggregates_and_notifies() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut session = ready_session();
        let sink = seen.clone();
        session.on_select(move |node| sink.lock().unwrap().push(node.id.clone()));
        session.visualize().unwrap();

        let details = session.select("2").unwrap();
        assert_eq!(details.cluster.level, 2);
        let chats: Vec<&str> = details.conversations.iter().map(|c| c.chat_id()).collect();
        assert_eq!(chats, vec!["c1", "c2"]);
        assert_eq!(details.metadata.count("tags", "a"), 2);
        assert_eq!(details.metadata.count("tags", "b"), 2);

        assert_eq!(*seen.lock().unwrap(), vec!["2".to_string()]);
        assert_eq!(session.selected().unwrap().id, "2");
        assert_eq!(session.selected_level_clusters().len(), 2);
    }

    #[test]
    fn test_select_uses_configured_mode() {
        let mut session = ExplorerSession::new(SessionConfig {
            aggregation_mode: AggregationMode::List,
            ..Default::default()
        });
        session.load(conversations());
        session.load(summaries());
        session.load(clusters());
        session.visualize().unwrap();

        let details = session.select("1").unwrap();
        assert_eq!(details.metadata.count("tags", "a, b"), 2);
        assert_eq!(details.metadata.count("tags", "c"), 1);
        assert_eq!(details.metadata.count("tags", "a"), 0);
    }

    #[test]
    fn test_select_errors() {
        let mut session = ready_session();
        assert_eq!(session.select("1").unwrap_err(), SessionError::NoView);

        session.visualize().unwrap();
        assert_eq!(
            session.select("root").unwrap_err(),
            SessionError::UnknownCluster("root".to_string())
        );
        assert!(session.selected().is_none());
    }

    #[test]
    fn test_new_data_discards_view() {
        let mut session = ready_session();
        session.visualize().unwrap();
        session.select("1").unwrap();

        session.load(clusters());
        assert!(session.view().is_none());
        assert!(session.selected().is_none());
        assert!(session.is_ready());
    }

    #[test]
    fn test_reset_clears_and_notifies() {
        let resets = Arc::new(AtomicUsize::new(0));
        let mut session = ready_session();
        let counter = resets.clone();
        session.on_reset(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        session.visualize().unwrap();

        session.reset();
        assert_eq!(resets.load(Ordering::SeqCst), 1);
        assert_eq!(
            session.status(),
            SessionStatus {
                conversations: None,
                summaries: None,
                clusters: None,
                visualized: false,
            }
        );
    }

    #[tokio::test]
    async fn test_failed_file_keeps_previous_data() {
        let dir = tempfile::tempdir().unwrap();
        let summaries_path = dir.path().join(ingest::SUMMARIES_FILE);
        std::fs::write(&summaries_path, "{\"chat_id\": \"c1\", \"summary\": \"s\"}\n").unwrap();

        let mut session = ExplorerSession::default();
        let reports = session.load_files(&[summaries_path.clone()]).await;
        assert_eq!(reports[0].1.as_ref().unwrap(), &1);

        std::fs::write(&summaries_path, "{\"chat_id\": \"c1\", \"summary\": \"s\"}\n{oops\n").unwrap();
        let reports = session.load_files(&[summaries_path]).await;
        assert!(matches!(reports[0].1, Err(IngestError::Line { line: 2, .. })));
        assert_eq!(session.status().summaries, Some(1));
    }
}
