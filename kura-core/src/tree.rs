//! Cluster hierarchy reconstruction
//!
//! Clusters arrive as a flat list of parent-pointer records. The builder
//! indexes `parent_id -> children` in one pass, then assembles the tree
//! depth-first under a synthetic root. Children keep their input order.
//!
//! Levels are distance from the synthetic root: top-level clusters are level 1.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::models::{ClusterRecord, ClusterTreeNode};

/// What to do with clusters whose `parent_id` matches no cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Leave them (and anything below them) out of the tree, with a warning.
    #[default]
    Drop,
    /// Hang them directly under the synthetic root.
    AttachToRoot,
    /// Fail the build.
    Reject,
}

/// Positions into the input slice, grouped by parent.
struct ChildIndex<'a> {
    records: &'a [ClusterRecord],
    top_level: Vec<usize>,
    children: HashMap<&'a str, Vec<usize>>,
}

impl<'a> ChildIndex<'a> {
    fn children_of(&self, id: &str) -> &[usize] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build the subtree rooted at `records[pos]`.
    fn assemble(&self, pos: usize, level: usize, visited: &mut HashSet<usize>) -> ClusterTreeNode {
        visited.insert(pos);
        let record = &self.records[pos];
        let children = self
            .children_of(&record.id)
            .iter()
            .map(|&child| self.assemble(child, level + 1, visited))
            .collect();
        ClusterTreeNode::from_record(record, level, children)
    }
}

/// Reassemble the cluster hierarchy under a synthetic root.
pub fn build_tree(clusters: &[ClusterRecord], policy: OrphanPolicy) -> Result<ClusterTreeNode, TreeError> {
    tracing::debug!("Building cluster tree with {} clusters", clusters.len());

    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(clusters.len());
    for (pos, record) in clusters.iter().enumerate() {
        if positions.insert(record.id.as_str(), pos).is_some() {
            return Err(TreeError::DuplicateId(record.id.clone()));
        }
    }

    let mut index = ChildIndex {
        records: clusters,
        top_level: Vec::new(),
        children: HashMap::new(),
    };
    let mut orphans = Vec::new();

    for (pos, record) in clusters.iter().enumerate() {
        match record.parent_id.as_deref() {
            None => index.top_level.push(pos),
            Some(parent) if positions.contains_key(parent) => {
                index.children.entry(parent).or_default().push(pos);
            }
            Some(parent) => match policy {
                OrphanPolicy::Reject => {
                    return Err(TreeError::DanglingParent {
                        id: record.id.clone(),
                        parent_id: parent.to_string(),
                    });
                }
                OrphanPolicy::AttachToRoot => index.top_level.push(pos),
                OrphanPolicy::Drop => orphans.push(pos),
            },
        }
    }

    let mut visited = HashSet::with_capacity(clusters.len());
    let children = index
        .top_level
        .iter()
        .map(|&pos| index.assemble(pos, 1, &mut visited))
        .collect();
    let root = ClusterTreeNode::root(children);

    if visited.len() < clusters.len() {
        check_unreached(clusters, &positions, &visited)?;

        let dropped = clusters.len() - visited.len();
        let orphan_ids: Vec<&str> = orphans.iter().map(|&pos| clusters[pos].id.as_str()).collect();
        tracing::warn!(
            "Dropped {} cluster(s) under missing parents; orphans: {}",
            dropped,
            orphan_ids.join(", ")
        );
    }

    Ok(root)
}

/// Every cluster the assembly did not reach either descends from a dropped
/// orphan or sits on a parent cycle. Walk each one up to tell which; chains
/// already known to end at a missing parent are not walked again.
fn check_unreached(
    clusters: &[ClusterRecord],
    positions: &HashMap<&str, usize>,
    visited: &HashSet<usize>,
) -> Result<(), TreeError> {
    let mut resolved: HashSet<usize> = HashSet::new();

    for (start, _) in clusters.iter().enumerate().filter(|(pos, _)| !visited.contains(pos)) {
        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        let mut current = start;
        loop {
            if resolved.contains(&current) {
                break;
            }
            if !on_path.insert(current) {
                return Err(TreeError::Cycle(clusters[current].id.clone()));
            }
            path.push(current);
            let next = clusters[current]
                .parent_id
                .as_deref()
                .and_then(|parent| positions.get(parent));
            match next {
                Some(&parent) => current = parent,
                None => break,
            }
        }
        resolved.extend(path);
    }
    Ok(())
}

// ============================================================================
// Flattening
// ============================================================================

/// Pre-order walk: each node before its children, children in stored order.
/// The root is included.
pub fn flatten_tree(root: &ClusterTreeNode) -> Vec<&ClusterTreeNode> {
    let mut out = Vec::with_capacity(1 + root.descendant_count());
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(node.children.iter().rev());
    }
    out
}

/// A tree node without its subtree, for level-based listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatClusterNode {
    pub id: String,
    pub name: String,
    pub description: String,
    pub parent_id: Option<String>,
    pub chat_ids: Vec<String>,
    pub x_coord: f64,
    pub y_coord: f64,
    pub count: u64,
    pub level: usize,
    pub child_ids: Vec<String>,
}

impl From<&ClusterTreeNode> for FlatClusterNode {
    fn from(node: &ClusterTreeNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            description: node.description.clone(),
            parent_id: node.parent_id.clone(),
            chat_ids: node.chat_ids.clone(),
            x_coord: node.x_coord,
            y_coord: node.y_coord,
            count: node.count,
            level: node.level,
            child_ids: node.children.iter().map(|c| c.id.clone()).collect(),
        }
    }
}

/// Owned pre-order copy of the tree.
pub fn flatten_owned(root: &ClusterTreeNode) -> Vec<FlatClusterNode> {
    flatten_tree(root).into_iter().map(FlatClusterNode::from).collect()
}

pub fn nodes_at_level(flat: &[FlatClusterNode], level: usize) -> Vec<&FlatClusterNode> {
    flat.iter().filter(|node| node.level == level).collect()
}

/// Distinct levels present, ascending.
pub fn levels(flat: &[FlatClusterNode]) -> Vec<usize> {
    flat.iter()
        .map(|node| node.level)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
