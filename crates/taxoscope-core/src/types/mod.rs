//! # Core Type Definitions
//!
//! This module contains the value types shared by every Taxoscope component:
//! - Identifiers and ranks (`TaxonId`, `Rank`)
//! - Graph records (`TaxonNode`, `TaxonEdge`)
//! - Overlay content (`TaxonDetail`)
//! - Error types (`TaxoError`)
//!
//! ## Identity
//!
//! A taxon is identified solely by its store-assigned `TaxonId`. Names and
//! ranks are payload; two records with the same id are the same taxon even if
//! their payload disagrees.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque, store-assigned identifier of a taxon.
///
/// For ArangoDB this is the document handle `<collection>/<key>`,
/// e.g. `phylumTaxa/1734`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonId(String);

impl TaxonId {
    /// Create an identifier from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build a document handle from a collection name and a document key.
    #[must_use]
    pub fn from_parts(collection: &str, key: &str) -> Self {
        Self(format!("{}/{}", collection, key))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The document key: the part after the collection prefix, or the whole
    /// identifier when there is no prefix.
    #[must_use]
    pub fn key(&self) -> &str {
        self.0
            .split_once('/')
            .map_or(self.0.as_str(), |(_, key)| key)
    }
}

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaxonId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaxonId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A taxonomic rank tag (kingdom, phylum, ...).
///
/// Ranks are normalized to lowercase on construction, so records written by
/// the crawler as `"Phylum"` compare equal to the table's `"phylum"`.
/// Whether a rank is *known* is decided by the `RankHierarchy`, not here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Rank(String);

impl Rank {
    /// Create a rank tag, normalizing case and surrounding whitespace.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// Get the rank as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Rank {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Rank {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Rank> for String {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

// =============================================================================
// GRAPH RECORDS
// =============================================================================

/// A taxon materialized (or about to be materialized) in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonNode {
    /// Store-assigned identity.
    pub id: TaxonId,
    /// Display name, e.g. "Animalia".
    pub name: String,
    /// Rank of this taxon.
    pub rank: Rank,
}

impl TaxonNode {
    /// Create a new taxon record.
    #[must_use]
    pub fn new(id: impl Into<TaxonId>, name: impl Into<String>, rank: impl Into<Rank>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rank: rank.into(),
        }
    }
}

/// A parent → child membership relation between two materialized taxa.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxonEdge {
    /// The parent (expanded) taxon.
    pub source: TaxonId,
    /// The child taxon.
    pub target: TaxonId,
}

impl TaxonEdge {
    /// Create a new parent → child edge.
    #[must_use]
    pub fn new(source: TaxonId, target: TaxonId) -> Self {
        Self { source, target }
    }
}

/// Overlay content for a taxon, read from its rank's entity collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxonDetail {
    /// Short biological summary (plain text).
    pub summary: String,
    /// Illustration URL, if the record has one.
    pub image: Option<String>,
    /// Source page the record was scraped from.
    pub url: Option<String>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Taxoscope system.
///
/// - No silent failures: store failures are never reported as empty results
/// - Use `Result<T, TaxoError>` for fallible operations
/// - The engine never panics; all errors are recoverable by the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxoError {
    /// The taxonomy store could not be reached or refused the request.
    #[error("Taxonomy store unavailable: {0}")]
    StoreUnavailable(String),

    /// A query returned no rows where exactly one was expected.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The rank hierarchy has no entry for this rank.
    #[error("Unknown rank: {0}")]
    UnknownRank(Rank),

    /// An edge endpoint is missing from the graph model.
    #[error("Dangling edge: {parent} -> {child}")]
    DanglingEdge {
        /// Parent endpoint.
        parent: TaxonId,
        /// Child endpoint.
        child: TaxonId,
    },

    /// An edge would make a node its own ancestor.
    #[error("Cycle: {child} is already an ancestor of {parent}")]
    Cycle {
        /// Parent endpoint.
        parent: TaxonId,
        /// Child endpoint.
        child: TaxonId,
    },

    /// A gesture referenced a node the graph does not hold.
    #[error("Node not in graph: {0}")]
    InvalidGesture(TaxonId),

    /// A fetch completed for a node that was not waiting for one.
    #[error("Stale completion for node: {0}")]
    StaleCompletion(TaxonId),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
