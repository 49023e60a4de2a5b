use serde::{Deserialize, Serialize};

/// Id of the synthetic root node.
pub const ROOT_ID: &str = "root";

/// Name and description of the synthetic root node.
pub const ROOT_NAME: &str = "Root";

/// One line of `dimensionality.jsonl`: a projected cluster that points at its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub chat_ids: Vec<String>,
    pub x_coord: f64,
    pub y_coord: f64,
    pub count: u64,
    /// Level as written by the producer. The tree builder assigns its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u64>,
}

/// A cluster with its children attached and its depth below the synthetic root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterTreeNode {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub parent_id: Option<String>,
    pub chat_ids: Vec<String>,
    pub x_coord: f64,
    pub y_coord: f64,
    pub count: u64,
    pub level: usize,
    pub children: Vec<ClusterTreeNode>,
}

impl ClusterTreeNode {
    /// The sentinel node every tree hangs from.
    pub fn root(children: Vec<ClusterTreeNode>) -> Self {
        Self {
            id: ROOT_ID.to_string(),
            name: ROOT_NAME.to_string(),
            description: ROOT_NAME.to_string(),
            slug: None,
            parent_id: None,
            chat_ids: Vec::new(),
            x_coord: 0.0,
            y_coord: 0.0,
            count: 0,
            level: 0,
            children,
        }
    }

    pub fn from_record(record: &ClusterRecord, level: usize, children: Vec<ClusterTreeNode>) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            slug: record.slug.clone(),
            parent_id: record.parent_id.clone(),
            chat_ids: record.chat_ids.clone(),
            x_coord: record.x_coord,
            y_coord: record.y_coord,
            count: record.count,
            level,
            children,
        }
    }

    /// True for the synthetic root only. Real clusters always sit at level >= 1.
    pub fn is_root(&self) -> bool {
        self.level == 0 && self.id == ROOT_ID
    }

    /// Depth-first search for a node by id, including `self`.
    pub fn find(&self, id: &str) -> Option<&ClusterTreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }
}
