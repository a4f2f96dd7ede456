//! # Graph Model
//!
//! The in-memory set of materialized taxa and membership edges.
//!
//! This module implements the `GraphModel` trait.
//! Lookups use `BTreeMap`/`BTreeSet`; iteration follows insertion order so
//! the renderer sees children in the order the store returned them.
//!
//! ## Invariants
//!
//! - At most one node per `TaxonId`; re-adding is a no-op and never replaces
//!   the existing record.
//! - At most one edge per `(source, target)`.
//! - Both endpoints of an edge exist before the edge does.
//! - No node is its own ancestor: self-loops and cycles are rejected.

use crate::{TaxoError, TaxonEdge, TaxonId, TaxonNode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPHMODEL TRAIT
// =============================================================================

/// Add/query contract the expansion engine relies on.
pub trait GraphModel {
    /// Check if a node with this id is materialized.
    fn has_node(&self, id: &TaxonId) -> bool;

    /// Get a materialized node.
    fn node(&self, id: &TaxonId) -> Option<&TaxonNode>;

    /// Add a node. Returns `false` (and changes nothing) if the id is present.
    fn add_node(&mut self, node: TaxonNode) -> bool;

    /// Add an edge. Returns `false` for a duplicate pair.
    /// Fails with `DanglingEdge` if either endpoint is absent, and with
    /// `Cycle` if the target already reaches the source.
    fn add_edge(&mut self, edge: TaxonEdge) -> Result<bool, TaxoError>;

    /// Children of a node, following edges in insertion order.
    fn children_of(&self, id: &TaxonId) -> Vec<&TaxonNode>;

    /// Get the total number of nodes.
    fn node_count(&self) -> usize;

    /// Get the total number of edges.
    fn edge_count(&self) -> usize;
}

// =============================================================================
// EVENTS & BATCHES
// =============================================================================

/// A change the rendering surface must reflect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    /// A node was materialized.
    NodeAdded {
        /// The new node.
        node: TaxonNode,
    },
    /// An edge was materialized.
    EdgeAdded {
        /// The new edge.
        edge: TaxonEdge,
    },
}

/// The result of one successful child fetch, applied all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionBatch {
    /// The expanded node.
    pub parent: TaxonId,
    /// Children in store order.
    pub children: Vec<TaxonNode>,
}

/// Serializable view of the whole graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Nodes in insertion order.
    pub nodes: Vec<TaxonNode>,
    /// Edges in insertion order.
    pub edges: Vec<TaxonEdge>,
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The materialized taxonomy graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Node storage: TaxonId -> TaxonNode
    nodes: BTreeMap<TaxonId, TaxonNode>,

    /// Node ids in insertion order
    node_order: Vec<TaxonId>,

    /// Edge index for duplicate detection
    edge_index: BTreeSet<(TaxonId, TaxonId)>,

    /// Edges in insertion order
    edge_order: Vec<TaxonEdge>,

    /// Adjacency list: parent -> children, insertion order
    children: BTreeMap<TaxonId, Vec<TaxonId>>,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &TaxonNode> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Get all edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &TaxonEdge> {
        self.edge_order.iter()
    }

    /// Check if the graph contains an edge.
    #[must_use]
    pub fn contains_edge(&self, source: &TaxonId, target: &TaxonId) -> bool {
        self.edge_index
            .contains(&(source.clone(), target.clone()))
    }

    /// Apply an expansion batch.
    ///
    /// For each child, in order: add the node (reusing an existing one), then
    /// the edge `parent -> child`. The batch is checked before anything is
    /// written, so a failure leaves the graph untouched. Returns only the
    /// events for additions that actually happened.
    pub fn apply_batch(&mut self, batch: &ExpansionBatch) -> Result<Vec<GraphEvent>, TaxoError> {
        if !self.has_node(&batch.parent) {
            let child = batch
                .children
                .first()
                .map(|c| c.id.clone())
                .unwrap_or_else(|| batch.parent.clone());
            return Err(TaxoError::DanglingEdge {
                parent: batch.parent.clone(),
                child,
            });
        }

        if let Some(child) = batch
            .children
            .iter()
            .find(|child| self.reaches(&child.id, &batch.parent))
        {
            return Err(TaxoError::Cycle {
                parent: batch.parent.clone(),
                child: child.id.clone(),
            });
        }

        let mut events = Vec::with_capacity(batch.children.len() * 2);
        for child in &batch.children {
            let child_id = child.id.clone();
            if self.add_node(child.clone()) {
                events.push(GraphEvent::NodeAdded {
                    node: child.clone(),
                });
            }
            let edge = TaxonEdge::new(batch.parent.clone(), child_id);
            if self.add_edge(edge.clone())? {
                events.push(GraphEvent::EdgeAdded { edge });
            }
        }
        Ok(events)
    }

    /// Whether `to` is `from` or one of its descendants.
    fn reaches(&self, from: &TaxonId, to: &TaxonId) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(kids) = self.children.get(id) {
                stack.extend(kids);
            }
        }
        false
    }

    /// Copy the graph into a serializable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }
}

impl GraphModel for Graph {
    fn has_node(&self, id: &TaxonId) -> bool {
        self.nodes.contains_key(id)
    }

    fn node(&self, id: &TaxonId) -> Option<&TaxonNode> {
        self.nodes.get(id)
    }

    fn add_node(&mut self, node: TaxonNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.node_order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        true
    }

    fn add_edge(&mut self, edge: TaxonEdge) -> Result<bool, TaxoError> {
        if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
            return Err(TaxoError::DanglingEdge {
                parent: edge.source,
                child: edge.target,
            });
        }
        let pair = (edge.source.clone(), edge.target.clone());
        if self.edge_index.contains(&pair) {
            return Ok(false);
        }
        if self.reaches(&edge.target, &edge.source) {
            return Err(TaxoError::Cycle {
                parent: edge.source,
                child: edge.target,
            });
        }
        self.edge_index.insert(pair);
        self.children
            .entry(edge.source.clone())
            .or_default()
            .push(edge.target.clone());
        self.edge_order.push(edge);
        Ok(true)
    }

    fn children_of(&self, id: &TaxonId) -> Vec<&TaxonNode> {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.nodes.get(child))
            .collect()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edge_order.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
