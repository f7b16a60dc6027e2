//! Schema Flow Graph
//!
//! Output of the compiler: object and enum nodes plus the references
//! between them. Nodes are positionless; ids are opaque stable strings and
//! every edge endpoint names a node in the same graph.
//!
//! Consumers:
//! - Layout (`layout.rs`) assigns positions from ids and edge endpoints
//! - JSON/DOT export for rendering surfaces

pub mod builder;
pub mod descriptor;
pub mod layout;
pub mod type_string;

pub use builder::{compile_dictionary, compile_root, CompileOptions, GraphBuilder, NodeContext};
pub use descriptor::TypeDescriptor;
pub use layout::{Direction, LaidOutGraph, LayeredLayout, LayoutEngine, Position, PositionedNode};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::Result;
use crate::schema::BaseSchema;

// =============================================================================
// Nodes
// =============================================================================

/// Kind of a graph node, as seen by a rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    ObjectNode,
    EnumNode,
}

/// One field row of an object node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEntry {
    pub name: String,
    /// Encoded descriptor (canonical grammar)
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    /// Display-ready rendering of `ty`
    pub display: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether the field references another node (gets a source handle)
    pub handle: bool,
}

impl FieldEntry {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor, base: &BaseSchema) -> Self {
        Self {
            name: name.into(),
            display: ty.display(),
            handle: !ty.references().is_empty(),
            ty,
            optional: base.optional,
            nullable: base.nullable,
            default: base.default_value.clone(),
        }
    }
}

/// Node payload: ordered fields or ordered enum members
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodePayload {
    ObjectNode { fields: Vec<FieldEntry> },
    EnumNode { members: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub payload: NodePayload,
}

impl GraphNode {
    pub fn object(id: impl Into<String>, label: impl Into<String>, fields: Vec<FieldEntry>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            payload: NodePayload::ObjectNode { fields },
        }
    }

    pub fn enumeration(id: impl Into<String>, label: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            payload: NodePayload::EnumNode { members },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.payload {
            NodePayload::ObjectNode { .. } => NodeKind::ObjectNode,
            NodePayload::EnumNode { .. } => NodeKind::EnumNode,
        }
    }

    /// Field rows (empty for enum nodes)
    pub fn fields(&self) -> &[FieldEntry] {
        match &self.payload {
            NodePayload::ObjectNode { fields } => fields,
            NodePayload::EnumNode { .. } => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Enum members (empty for object nodes)
    pub fn members(&self) -> &[String] {
        match &self.payload {
            NodePayload::EnumNode { members } => members,
            NodePayload::ObjectNode { .. } => &[],
        }
    }
}

// =============================================================================
// Edges
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Field key on the source node the edge leaves from
    pub source_handle: String,
}

// =============================================================================
// Graph
// =============================================================================

/// Node match from a fuzzy search
#[derive(Debug, Clone, Serialize)]
pub struct NodeMatch {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub score: i64,
}

/// Compiled nodes and edges
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl FlowGraph {
    /// Splice another subtree's output onto this one
    pub fn extend(&mut self, other: FlowGraph) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    pub fn edges_between<'a>(
        &'a self,
        source: &'a str,
        target: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source == source && e.target == target)
    }

    /// Edges whose source or target is missing from the node list
    pub fn dangling_edges(&self) -> Vec<&GraphEdge> {
        let ids: std::collections::HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .iter()
            .filter(|e| !ids.contains(e.source.as_str()) || !ids.contains(e.target.as_str()))
            .collect()
    }

    /// petgraph view: node weights are ids, edge weights are source handles.
    /// Edges with unknown endpoints are left out.
    pub fn to_petgraph(&self) -> (DiGraph<String, String>, HashMap<String, NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut indices = HashMap::with_capacity(self.nodes.len());

        for node in &self.nodes {
            indices
                .entry(node.id.clone())
                .or_insert_with(|| graph.add_node(node.id.clone()));
        }

        for edge in &self.edges {
            if let (Some(&from), Some(&to)) = (indices.get(&edge.source), indices.get(&edge.target)) {
                graph.add_edge(from, to, edge.source_handle.clone());
            }
        }

        (graph, indices)
    }

    /// Search nodes by id or label (fuzzy)
    pub fn search(&self, query: &str, limit: usize) -> Vec<NodeMatch> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let matcher = SkimMatcherV2::default();
        let mut results: Vec<(i64, &GraphNode)> = Vec::new();

        for node in &self.nodes {
            let best = [node.id.as_str(), node.label.as_str()]
                .iter()
                .filter_map(|text| matcher.fuzzy_match(text, query))
                .max();
            if let Some(score) = best {
                results.push((score, node));
            }
        }

        // Sort by score descending, ties in graph order
        results.sort_by(|a, b| b.0.cmp(&a.0));

        results
            .into_iter()
            .take(limit)
            .map(|(score, node)| NodeMatch {
                id: node.id.clone(),
                label: node.label.clone(),
                kind: node.kind(),
                score,
            })
            .collect()
    }

    /// SHA-256 over the canonical JSON form; equal graphs hash equal
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
    }

    /// Export to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        // Header with styling
        output.push_str("digraph SchemaFlow {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  bgcolor=\"#1e1e1e\";\n");
        output.push_str("  node [shape=record, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10, fontcolor=\"white\", color=\"#404040\"];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\"];\n");
        output.push('\n');

        for node in &self.nodes {
            let (color, rows) = match &node.payload {
                NodePayload::ObjectNode { fields } => (
                    "#00BCD4",
                    fields
                        .iter()
                        .map(|f| format!("{}: {}", f.name, f.display))
                        .collect::<Vec<_>>(),
                ),
                NodePayload::EnumNode { members } => ("#FF5722", members.clone()),
            };

            let mut label = dot_record_escape(&node.label);
            if !rows.is_empty() {
                let body: Vec<String> = rows.iter().map(|r| dot_record_escape(r)).collect();
                label = format!("{{{}|{}\\l}}", label, body.join("\\l"));
            }
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n",
                dot_escape(&node.id),
                label,
                color
            ));
        }

        output.push('\n');

        for edge in &self.edges {
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                dot_escape(&edge.source),
                dot_escape(&edge.target),
                dot_escape(&edge.source_handle)
            ));
        }

        output.push_str("}\n");
        output
    }
}

fn dot_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn dot_record_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in dot_escape(text).chars() {
        if matches!(c, '{' | '}' | '|' | '<' | '>') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Output Document
// =============================================================================

/// Graph plus load status, as handed to a rendering surface
#[derive(Debug, Clone, Serialize)]
pub struct FlowDocument<G: Serialize> {
    #[serde(flatten)]
    pub graph: G,
    /// True when the requested schemas failed to load and bundled examples were used
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}
