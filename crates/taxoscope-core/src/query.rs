//! # Store Query Shapes
//!
//! The three lookups the taxonomy store must answer, as plain values:
//!
//! - `RootQuery`: one entity by a distinguishing field (the root's name)
//! - `ChildQuery`: entities joined to a parent through a membership-edge collection
//! - `DetailQuery`: one entity by id
//!
//! Collection names come from the `RankHierarchy` only. Each shape renders
//! to parameterized AQL; collections travel as `@@` bind parameters and the
//! edge endpoint is one of two fixed attribute names, so no caller-supplied
//! string is ever spliced into query text.

use crate::rank::{ChildLookup, Endpoint, RankHierarchy};
use crate::{Rank, TaxoError, TaxonId, TaxonNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rendered AQL statement with its bind variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aql {
    /// Query text.
    pub query: String,
    /// Bind variables; collection parameters are keyed with a leading `@`.
    #[serde(rename = "bindVars")]
    pub bind_vars: BTreeMap<String, String>,
}

impl Aql {
    fn new(query: String) -> Self {
        Self {
            query,
            bind_vars: BTreeMap::new(),
        }
    }

    fn bind(mut self, key: &str, value: impl Into<String>) -> Self {
        self.bind_vars.insert(key.to_string(), value.into());
        self
    }
}

// =============================================================================
// ROOT
// =============================================================================

/// Select the single distinguished root taxon by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootQuery {
    /// Rank of the root (top row of the table).
    pub rank: Rank,
    /// Entity collection of the root rank.
    pub collection: String,
    /// Value of the `name` field to match, e.g. "Animalia".
    pub name: String,
}

impl RootQuery {
    /// Root lookup in the table's top rank.
    #[must_use]
    pub fn new(hierarchy: &RankHierarchy, name: impl Into<String>) -> Self {
        let level = hierarchy.root_level();
        Self {
            rank: level.rank.clone(),
            collection: level.entity_collection.clone(),
            name: name.into(),
        }
    }

    /// Render as AQL.
    #[must_use]
    pub fn to_aql(&self) -> Aql {
        Aql::new("FOR t IN @@taxa FILTER t.name == @name LIMIT 1 RETURN t".to_string())
            .bind("@taxa", &self.collection)
            .bind("name", &self.name)
    }
}

// =============================================================================
// CHILDREN
// =============================================================================

/// Fetch the immediate children of one taxon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildQuery {
    /// The taxon being expanded.
    pub parent: TaxonNode,
    /// Resolved collections and edge direction.
    pub lookup: ChildLookup,
}

impl ChildQuery {
    /// Resolve the child query for `parent`.
    ///
    /// `Ok(None)` for a terminal-rank parent; `UnknownRank` when the
    /// parent's rank is not in the table.
    pub fn resolve(hierarchy: &RankHierarchy, parent: &TaxonNode) -> Result<Option<Self>, TaxoError> {
        Ok(hierarchy
            .child_lookup(&parent.rank)?
            .map(|lookup| Self {
                parent: parent.clone(),
                lookup,
            }))
    }

    /// Endpoint of the edge documents that holds the child id.
    #[must_use]
    pub fn child_endpoint(&self) -> Endpoint {
        self.lookup.anchor.opposite()
    }

    /// Render as AQL.
    #[must_use]
    pub fn to_aql(&self) -> Aql {
        let query = format!(
            "FOR e IN @@members FILTER e.{anchor} == @parent \
             FOR t IN @@taxa FILTER t._id == e.{child} RETURN t",
            anchor = self.lookup.anchor.field(),
            child = self.child_endpoint().field(),
        );
        Aql::new(query)
            .bind("@members", &self.lookup.edge_collection)
            .bind("@taxa", &self.lookup.child_collection)
            .bind("parent", self.parent.id.as_str())
    }
}

// =============================================================================
// DETAIL
// =============================================================================

/// Read one taxon's full record for overlay content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailQuery {
    /// Taxon to read.
    pub id: TaxonId,
    /// Its rank.
    pub rank: Rank,
    /// The rank's entity collection.
    pub collection: String,
}

impl DetailQuery {
    /// Resolve the detail lookup for `node`.
    pub fn resolve(hierarchy: &RankHierarchy, node: &TaxonNode) -> Result<Self, TaxoError> {
        Self::by_id(hierarchy, node.id.clone(), &node.rank)
    }

    /// Resolve a detail lookup from an id and rank alone.
    pub fn by_id(hierarchy: &RankHierarchy, id: TaxonId, rank: &Rank) -> Result<Self, TaxoError> {
        Ok(Self {
            collection: hierarchy.entity_collection(rank)?.to_string(),
            rank: rank.clone(),
            id,
        })
    }

    /// Render as AQL.
    #[must_use]
    pub fn to_aql(&self) -> Aql {
        Aql::new("FOR t IN @@taxa FILTER t._id == @id LIMIT 1 RETURN t".to_string())
            .bind("@taxa", &self.collection)
            .bind("id", self.id.as_str())
    }
}

// =============================================================================
// TESTS
// =============================================================================
