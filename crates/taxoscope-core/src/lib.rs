//! # taxoscope-core
//!
//! The lazy hierarchical expansion engine for Taxoscope - THE ENGINE.
//!
//! A taxonomy is shown as a node-link graph that starts with a single root
//! taxon. Clicking a node materializes its immediate children, fetched from a
//! rank-partitioned store; hovering a node shows a short summary.
//!
//! ## Components (leaf to root)
//!
//! - `rank`: Rank Hierarchy Table (rank order, collection naming, edge direction)
//! - `query`: store query shapes, rendered to AQL
//! - `graph`: Graph Model (materialized nodes and edges, no duplicates)
//! - `expansion`: Expansion Engine (per-node state machine, batch merge)
//! - `overlay`: Annotation Overlay
//! - `interaction`: Interaction Controller (message dispatch → effects)
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies: store access leaves the crate as
//!   `Effect`s and comes back as `Completion` messages
//! - Deterministic: `BTreeMap`/`BTreeSet` only
//! - Never panics; every failure is a `TaxoError`

// =============================================================================
// MODULES
// =============================================================================

pub mod expansion;
pub mod graph;
pub mod interaction;
pub mod overlay;
pub mod query;
pub mod rank;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Rank, TaxoError, TaxonDetail, TaxonEdge, TaxonId, TaxonNode};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use expansion::{ExpandOutcome, ExpansionEngine, ExpansionState};
pub use graph::{ExpansionBatch, Graph, GraphEvent, GraphModel, GraphSnapshot};
pub use interaction::{
    Completion, Effect, ErrorScope, Gesture, HoverTicket, InteractionController, Message, Report,
};
pub use overlay::{Annotation, AnnotationOverlay, render_body};
pub use query::{Aql, ChildQuery, DetailQuery, RootQuery};
pub use rank::{ChildLookup, Endpoint, RankHierarchy, RankLevel};
