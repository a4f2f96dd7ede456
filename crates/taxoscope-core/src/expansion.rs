//! # Expansion Engine
//!
//! Per-node state machine that turns "expand this taxon" into at most one
//! outstanding child fetch, and merges the fetched children into the graph.
//!
//! ```text
//!   Unexpanded ──expand──▶ Loading ──complete──▶ Expanded
//!        ▲                    │
//!        │                  fail
//!        │                    ▼
//!        └─────expand────── Failed
//! ```
//!
//! - `expand` on `Loading` or `Expanded` is a no-op: never two fetches in
//!   flight for one node, never a re-fetch of an expanded node.
//! - A successful fetch is applied as one batch; the renderer sees the whole
//!   batch or nothing.
//! - There is no collapse. Children stay for the rest of the session.
//!
//! The engine owns the `Graph`. Nothing else can mutate it.

use crate::graph::{ExpansionBatch, Graph, GraphEvent, GraphModel};
use crate::query::ChildQuery;
use crate::rank::RankHierarchy;
use crate::{TaxoError, TaxonId, TaxonNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// STATE
// =============================================================================

/// Expansion state of one materialized node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExpansionState {
    /// Children never requested.
    Unexpanded,
    /// One child fetch is in flight.
    Loading,
    /// Children are in the graph.
    Expanded,
    /// The last fetch failed; the node may be expanded again.
    Failed {
        /// Rendered error of the failed fetch.
        reason: String,
    },
}

impl ExpansionState {
    /// Whether `expand` would issue a fetch from this state.
    #[must_use]
    pub fn can_expand(&self) -> bool {
        matches!(self, Self::Unexpanded | Self::Failed { .. })
    }
}

/// What `expand` decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// Issue exactly this fetch; the node is now `Loading`.
    Fetch(ChildQuery),
    /// A fetch is already in flight; nothing to do.
    InFlight,
    /// Children are already materialized; nothing to do.
    AlreadyExpanded,
    /// The node's rank is terminal; it is now `Expanded` with no children.
    Leaf,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Owns the graph and the per-node expansion states.
#[derive(Debug, Clone)]
pub struct ExpansionEngine {
    hierarchy: RankHierarchy,
    graph: Graph,
    states: BTreeMap<TaxonId, ExpansionState>,
    root: Option<TaxonId>,
}

impl ExpansionEngine {
    /// Create an engine with an empty graph.
    #[must_use]
    pub fn new(hierarchy: RankHierarchy) -> Self {
        Self {
            hierarchy,
            graph: Graph::new(),
            states: BTreeMap::new(),
            root: None,
        }
    }

    /// The rank table used to resolve child lookups.
    #[must_use]
    pub fn hierarchy(&self) -> &RankHierarchy {
        &self.hierarchy
    }

    /// Read-only view of the materialized graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The root taxon, once loaded.
    #[must_use]
    pub fn root(&self) -> Option<&TaxonId> {
        self.root.as_ref()
    }

    /// State of a materialized node, `None` if the graph does not hold it.
    #[must_use]
    pub fn state(&self, id: &TaxonId) -> Option<&ExpansionState> {
        self.states.get(id)
    }

    /// All node states, ordered by id.
    pub fn states(&self) -> impl Iterator<Item = (&TaxonId, &ExpansionState)> {
        self.states.iter()
    }

    /// Number of nodes with a fetch in flight.
    #[must_use]
    pub fn loading_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| matches!(s, ExpansionState::Loading))
            .count()
    }

    /// Materialize the root taxon.
    ///
    /// The root's rank must be in the table. Loading a root when one is
    /// already present changes nothing.
    pub fn load_root(&mut self, root: TaxonNode) -> Result<Vec<GraphEvent>, TaxoError> {
        if self.root.is_some() {
            return Ok(Vec::new());
        }
        self.hierarchy.level(&root.rank)?;

        let id = root.id.clone();
        self.graph.add_node(root.clone());
        self.states
            .entry(id.clone())
            .or_insert(ExpansionState::Unexpanded);
        self.root = Some(id);
        Ok(vec![GraphEvent::NodeAdded { node: root }])
    }

    /// Request expansion of a node.
    ///
    /// An unknown rank is reported as `UnknownRank` and leaves the state
    /// as it was.
    pub fn expand(&mut self, id: &TaxonId) -> Result<ExpandOutcome, TaxoError> {
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| TaxoError::InvalidGesture(id.clone()))?;

        match self.states.get(id) {
            Some(ExpansionState::Loading) => return Ok(ExpandOutcome::InFlight),
            Some(ExpansionState::Expanded) => return Ok(ExpandOutcome::AlreadyExpanded),
            _ => {}
        }

        let outcome = match ChildQuery::resolve(&self.hierarchy, node)? {
            Some(query) => {
                self.states.insert(id.clone(), ExpansionState::Loading);
                ExpandOutcome::Fetch(query)
            }
            None => {
                self.states.insert(id.clone(), ExpansionState::Expanded);
                ExpandOutcome::Leaf
            }
        };
        Ok(outcome)
    }

    /// Merge the children fetched for `parent`.
    ///
    /// Only valid while `parent` is `Loading`. On success the node becomes
    /// `Expanded` and every newly materialized child starts `Unexpanded`.
    pub fn complete(
        &mut self,
        parent: &TaxonId,
        children: Vec<TaxonNode>,
    ) -> Result<Vec<GraphEvent>, TaxoError> {
        self.require_loading(parent)?;

        let batch = ExpansionBatch {
            parent: parent.clone(),
            children,
        };
        let events = match self.graph.apply_batch(&batch) {
            Ok(events) => events,
            Err(e) => {
                self.states.insert(
                    parent.clone(),
                    ExpansionState::Failed {
                        reason: e.to_string(),
                    },
                );
                return Err(e);
            }
        };

        for child in &batch.children {
            self.states
                .entry(child.id.clone())
                .or_insert(ExpansionState::Unexpanded);
        }
        self.states.insert(parent.clone(), ExpansionState::Expanded);
        Ok(events)
    }

    /// Record a failed child fetch for `parent`. The graph is not touched.
    pub fn fail(&mut self, parent: &TaxonId, error: &TaxoError) -> Result<(), TaxoError> {
        self.require_loading(parent)?;
        self.states.insert(
            parent.clone(),
            ExpansionState::Failed {
                reason: error.to_string(),
            },
        );
        Ok(())
    }

    fn require_loading(&self, id: &TaxonId) -> Result<(), TaxoError> {
        match self.states.get(id) {
            Some(ExpansionState::Loading) => Ok(()),
            _ => Err(TaxoError::StaleCompletion(id.clone())),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
