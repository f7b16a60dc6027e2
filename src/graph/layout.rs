//! Layered layout
//!
//! Assigns positions from node ids and edge endpoints only. Ranks are
//! longest-path layers over the condensation of the graph, so reference
//! cycles between registered types still get a finite layering.

use petgraph::algo::{condensation, toposort};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::{FlowGraph, GraphEdge, GraphNode};

/// Flow direction of ranks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    #[serde(rename = "LR")]
    LeftRight,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TB" => Ok(Direction::TopBottom),
            "LR" => Ok(Direction::LeftRight),
            other => Err(format!("unknown direction '{}', expected TB or LR", other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::TopBottom => f.write_str("TB"),
            Direction::LeftRight => f.write_str("LR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedNode {
    #[serde(flatten)]
    pub node: GraphNode,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaidOutGraph {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<GraphEdge>,
}

impl LaidOutGraph {
    pub fn position(&self, id: &str) -> Option<Position> {
        self.nodes.iter().find(|n| n.node.id == id).map(|n| n.position)
    }
}

/// Anything that can place a compiled graph
pub trait LayoutEngine {
    fn layout(&self, graph: &FlowGraph) -> LaidOutGraph;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayeredLayout {
    pub direction: Direction,
    /// Distance between consecutive ranks
    pub rank_separation: f64,
    /// Distance between neighbours within a rank
    pub node_separation: f64,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self {
            direction: Direction::TopBottom,
            rank_separation: 200.0,
            node_separation: 300.0,
        }
    }
}

impl LayeredLayout {
    /// Rank per node id: sources at 0, each reference one rank further out
    fn ranks(&self, graph: &FlowGraph) -> HashMap<String, usize> {
        let (directed, _) = graph.to_petgraph();
        let condensed = condensation(directed, true);

        let mut component_rank = vec![0usize; condensed.node_count()];
        if let Ok(order) = toposort(&condensed, None) {
            for component in order {
                let rank = component_rank[component.index()];
                for edge in condensed.edges(component) {
                    let next = &mut component_rank[edge.target().index()];
                    *next = (*next).max(rank + 1);
                }
            }
        }

        let mut ranks = HashMap::new();
        for component in condensed.node_indices() {
            for id in &condensed[component] {
                ranks.insert(id.clone(), component_rank[component.index()]);
            }
        }
        ranks
    }
}

impl LayoutEngine for LayeredLayout {
    fn layout(&self, graph: &FlowGraph) -> LaidOutGraph {
        let ranks = self.ranks(graph);
        let mut filled: HashMap<usize, usize> = HashMap::new();

        let nodes = graph
            .nodes
            .iter()
            .map(|node| {
                let rank = ranks.get(&node.id).copied().unwrap_or(0);
                let slot = filled.entry(rank).or_insert(0);
                let along = rank as f64 * self.rank_separation;
                let across = *slot as f64 * self.node_separation;
                *slot += 1;

                let position = match self.direction {
                    Direction::TopBottom => Position { x: across, y: along },
                    Direction::LeftRight => Position { x: along, y: across },
                };
                PositionedNode {
                    node: node.clone(),
                    position,
                }
            })
            .collect();

        LaidOutGraph {
            nodes,
            edges: graph.edges.clone(),
        }
    }
}
