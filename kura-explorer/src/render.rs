//! Plain-text rendering of explorer replies
//!
//! All layout choices come from the `DisplayConfig` handed in by the caller.

use std::fmt::Write;

use kura_core::config::{DisplayConfig, TreeStyle};
use kura_core::session::SessionStatus;
use kura_core::{ClusterDetails, ClusterTreeNode, ConversationInfo, FlatClusterNode, MetadataSummary};

use crate::router::Reply;

struct Glyphs {
    branch: &'static str,
    last: &'static str,
    pipe: &'static str,
    blank: &'static str,
}

impl Glyphs {
    fn for_style(style: TreeStyle) -> Self {
        match style {
            TreeStyle::Unicode => Glyphs {
                branch: "├── ",
                last: "└── ",
                pipe: "│   ",
                blank: "    ",
            },
            TreeStyle::Ascii => Glyphs {
                branch: "|-- ",
                last: "`-- ",
                pipe: "|   ",
                blank: "    ",
            },
        }
    }
}

pub fn render_reply(reply: &Reply<'_>, display: &DisplayConfig) -> String {
    match reply {
        Reply::Status(status) => render_status(status),
        Reply::Tree(root) => render_tree(root, display.tree_style),
        Reply::Level { level, clusters } => render_level(*level, clusters),
        Reply::Cluster(details) => render_details(details),
        Reply::Conversations {
            cluster_id,
            conversations,
        } => render_conversations(cluster_id, conversations, display.summary_preview_chars),
    }
}

pub fn render_status(status: &SessionStatus) -> String {
    let count = |n: Option<usize>| n.map(|n| n.to_string()).unwrap_or_else(|| "not loaded".to_string());
    let mut out = String::new();
    let _ = writeln!(out, "Conversations: {}", count(status.conversations));
    let _ = writeln!(out, "Summaries:     {}", count(status.summaries));
    let _ = writeln!(out, "Clusters:      {}", count(status.clusters));
    let ready = status.conversations.is_some() && status.summaries.is_some() && status.clusters.is_some();
    let _ = writeln!(out, "Ready:         {}", if ready { "yes" } else { "no" });
    out
}

/// Draw the hierarchy below the synthetic root.
pub fn render_tree(root: &ClusterTreeNode, style: TreeStyle) -> String {
    let glyphs = Glyphs::for_style(style);
    let mut out = String::new();
    let _ = writeln!(out, "{} ({} top-level clusters)", root.name, root.children.len());
    draw_children(&root.children, "", &glyphs, &mut out);
    out
}

fn draw_children(children: &[ClusterTreeNode], prefix: &str, glyphs: &Glyphs, out: &mut String) {
    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == children.len();
        let connector = if is_last { glyphs.last } else { glyphs.branch };
        let _ = writeln!(out, "{}{}{} ({}) [{}]", prefix, connector, child.name, child.count, child.id);

        let extension = if is_last { glyphs.blank } else { glyphs.pipe };
        let next_prefix = format!("{}{}", prefix, extension);
        draw_children(&child.children, &next_prefix, glyphs, out);
    }
}

pub fn render_level(level: usize, clusters: &[&FlatClusterNode]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Level {}: {} cluster(s)", level, clusters.len());
    for node in clusters {
        let _ = writeln!(
            out,
            "  {} [{}]  count={}  at ({:.2}, {:.2})",
            node.name, node.id, node.count, node.x_coord, node.y_coord
        );
    }
    out
}

pub fn render_details(details: &ClusterDetails<'_>) -> String {
    let cluster = details.cluster;
    let mut out = String::new();
    let _ = writeln!(out, "{}", cluster.name);
    if !cluster.description.is_empty() {
        let _ = writeln!(out, "{}", cluster.description);
    }
    let _ = writeln!(
        out,
        "Level: {}  Conversations: {}",
        cluster.level,
        cluster.chat_ids.len()
    );
    let _ = writeln!(out, "Id: {}", cluster.id);

    if !details.metadata.is_empty() {
        out.push('\n');
        out.push_str(&render_metadata(&details.metadata));
    }
    out
}

pub fn render_metadata(summary: &MetadataSummary) -> String {
    let mut out = String::new();
    let mode = match summary.mode {
        kura_core::AggregationMode::Individual => "individual",
        kura_core::AggregationMode::List => "list",
    };
    let _ = writeln!(out, "Metadata Summary ({})", mode);
    for key in summary.keys() {
        let tokens: Vec<String> = summary
            .ranked(key)
            .into_iter()
            .map(|(token, n)| format!("{} ({})", token, n))
            .collect();
        let _ = writeln!(out, "  {}: {}", key, tokens.join(", "));
    }
    out
}

pub fn render_conversations(cluster_id: &str, conversations: &[&ConversationInfo], preview_chars: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} conversations in cluster {}",
        conversations.len(),
        cluster_id
    );
    for info in conversations {
        let preview: String = info.summary.chars().take(preview_chars).collect();
        let ellipsis = if info.summary.chars().count() > preview_chars { "..." } else { "" };
        let _ = writeln!(out, "\n{}\n  {}{}", info.chat_id(), preview, ellipsis);
    }
    out
}
