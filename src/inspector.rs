// src/inspector.rs

//! Tools for inspecting the structure of parsed trees.
//! Useful when debugging an encoder or a malformed payload.

use serde::Serialize;

use crate::format::Kind;
use crate::node::{NodeRef, Tree};

/// A structural report of a parsed tree.
#[derive(Debug, Serialize)]
pub struct DebugReport {
    /// Bytes taken up by the parsed value.
    pub consumed: usize,
    /// Bytes left after it.
    pub remaining: usize,
    /// Nodes in the tree.
    pub node_count: usize,
    /// Arena pages backing the tree.
    pub page_count: usize,
    /// Deepest nesting level reached; the root is level 0.
    pub max_depth: usize,
    /// Every node in pre-order.
    pub nodes: Vec<NodeInfo>,
}

/// Metadata for a single node.
#[derive(Debug, Serialize)]
pub struct NodeInfo {
    /// Node id as `page:slot`.
    pub id: String,
    /// Nesting level; the root is level 0.
    pub depth: usize,
    /// Value kind.
    pub kind: &'static str,
    /// Element, pair or byte count for compounds.
    pub len: Option<u32>,
    /// Payload offset for strings, binary blobs and extensions.
    pub data_offset: Option<usize>,
    /// Short rendering of scalar values.
    pub summary: Option<String>,
    /// Whether this is the last child of its parent.
    pub last: bool,
}

/// The tree inspector tool.
#[derive(Debug)]
pub struct TreeInspector;

impl TreeInspector {
    /// Walks a tree and returns a structural report. The walk is iterative,
    /// so arbitrarily deep trees are fine.
    pub fn inspect(tree: &Tree<'_>) -> DebugReport {
        let mut nodes = Vec::with_capacity(tree.node_count());
        let mut max_depth = 0;
        let mut stack = vec![(tree.root(), 0usize, true)];

        while let Some((node, depth, last)) = stack.pop() {
            max_depth = max_depth.max(depth);
            nodes.push(Self::inspect_node(&node, depth, last));

            let children: Vec<NodeRef<'_, '_>> = match node.kind() {
                Kind::Array => node.children().map(|c| c.collect()).unwrap_or_default(),
                Kind::Map => node
                    .entries()
                    .map(|entries| entries.flat_map(|(k, v)| [k, v]).collect())
                    .unwrap_or_default(),
                _ => Vec::new(),
            };
            let count = children.len();
            for (i, child) in children.into_iter().enumerate().rev() {
                stack.push((child, depth + 1, i + 1 == count));
            }
        }

        DebugReport {
            consumed: tree.consumed(),
            remaining: tree.remaining(),
            node_count: tree.node_count(),
            page_count: tree.page_count(),
            max_depth,
            nodes,
        }
    }

    fn inspect_node(node: &NodeRef<'_, '_>, depth: usize, last: bool) -> NodeInfo {
        let kind = node.kind();
        let summary = match kind {
            Kind::Nil => Some("nil".to_string()),
            Kind::Bool => node.as_bool().ok().map(|v| v.to_string()),
            Kind::Uint => node.as_u64().ok().map(|v| v.to_string()),
            Kind::Int => node.as_i64().ok().map(|v| v.to_string()),
            Kind::Float => node.as_f32().ok().map(|v| v.to_string()),
            Kind::Double => node.as_f64().ok().map(|v| v.to_string()),
            Kind::Str => node.as_str().ok().map(|s| format!("{s:?}")),
            _ => None,
        };

        NodeInfo {
            id: node.id().to_string(),
            depth,
            kind: kind.name(),
            len: node.len().ok(),
            data_offset: node.data_offset().ok(),
            summary,
            last,
        }
    }
}

impl std::fmt::Display for DebugReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== TREE INSPECTOR REPORT ===")?;
        writeln!(f, "Consumed:   {} bytes", self.consumed)?;
        writeln!(f, "Remaining:  {} bytes", self.remaining)?;
        writeln!(f, "Nodes:      {} in {} pages", self.node_count, self.page_count)?;
        writeln!(f, "Max depth:  {}", self.max_depth)?;
        writeln!(f, "\n[LAYOUT]")?;

        // Whether the ancestor at each level was the last of its siblings.
        let mut open: Vec<bool> = Vec::new();
        for node in &self.nodes {
            open.truncate(node.depth);
            let mut prefix = String::new();
            for &ancestor_last in open.iter().skip(1) {
                prefix.push_str(if ancestor_last { "    " } else { "│   " });
            }
            if node.depth > 0 {
                prefix.push_str(if node.last { "└── " } else { "├── " });
            }
            open.push(node.last);
            node.fmt_line(f, &prefix)?;
        }
        Ok(())
    }
}

impl NodeInfo {
    fn fmt_line(&self, f: &mut std::fmt::Formatter<'_>, prefix: &str) -> std::fmt::Result {
        write!(f, "{}[{}] {}", prefix, self.id, self.kind)?;
        if let Some(len) = self.len {
            write!(f, " | Len: {}", len)?;
        }
        if let Some(offset) = self.data_offset {
            write!(f, " | Offset: {}", offset)?;
        }
        if let Some(summary) = &self.summary {
            write!(f, " = {}", summary)?;
        }
        writeln!(f)
    }
}
