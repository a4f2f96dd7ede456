//! # In-Memory Store
//!
//! Collections held in memory, loaded from a JSON fixture:
//!
//! ```json
//! {
//!   "collections": { "kingdomTaxa": [ { "_id": "kingdomTaxa/1", "name": "Animalia", "rank": "Kingdom" } ] },
//!   "edges":       { "kingdomMembers": [ { "_from": "phylumTaxa/2", "_to": "kingdomTaxa/1" } ] }
//! }
//! ```
//!
//! Child lookups follow the same join as the AQL query: scan the membership
//! collection in order, match the parent on the anchor endpoint, resolve the
//! other endpoint in the child collection, skip edges whose child is missing.

use super::{StoredTaxon, TaxonRecord, TaxonomyStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use taxoscope_core::{ChildQuery, DetailQuery, Endpoint, RootQuery, TaxoError, TaxonNode};

/// A stored membership edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEdge {
    #[serde(rename = "_from")]
    pub from: String,
    #[serde(rename = "_to")]
    pub to: String,
}

impl StoredEdge {
    fn endpoint(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::From => &self.from,
            Endpoint::To => &self.to,
        }
    }
}

/// Fixture file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    /// Entity collections by name, documents in store order.
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<StoredTaxon>>,
    /// Edge collections by name, edges in store order.
    #[serde(default)]
    pub edges: BTreeMap<String, Vec<StoredEdge>>,
}

/// Store backed by a `Fixture`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    fixture: Fixture,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create a store over `fixture`.
    #[must_use]
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Load a fixture file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TaxoError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TaxoError::IoError(format!("Cannot read fixture '{}': {}", path.display(), e))
        })?;
        let fixture: Fixture = serde_json::from_str(&content).map_err(|e| {
            TaxoError::SerializationError(format!("Invalid fixture '{}': {}", path.display(), e))
        })?;
        tracing::info!(
            "Loaded fixture {} ({} collections, {} edge collections)",
            path.display(),
            fixture.collections.len(),
            fixture.edges.len()
        );
        Ok(Self::new(fixture))
    }

    /// Simulate an outage: every lookup fails with `StoreUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), TaxoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TaxoError::StoreUnavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }

    fn collection(&self, name: &str) -> Result<&[StoredTaxon], TaxoError> {
        self.fixture
            .collections
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| TaxoError::NotFound(format!("collection '{}'", name)))
    }

    fn edge_collection(&self, name: &str) -> Result<&[StoredEdge], TaxoError> {
        self.fixture
            .edges
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| TaxoError::NotFound(format!("collection '{}'", name)))
    }
}

#[async_trait]
impl TaxonomyStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn fetch_root(&self, query: &RootQuery) -> Result<TaxonNode, TaxoError> {
        self.check_available()?;
        self.collection(&query.collection)?
            .iter()
            .find(|doc| doc.name == query.name)
            .map(|doc| doc.to_node(&query.rank))
            .ok_or_else(|| {
                TaxoError::NotFound(format!(
                    "root taxon '{}' in {}",
                    query.name, query.collection
                ))
            })
    }

    async fn fetch_children(&self, query: &ChildQuery) -> Result<Vec<TaxonNode>, TaxoError> {
        self.check_available()?;
        let edges = self.edge_collection(&query.lookup.edge_collection)?;
        let taxa = self.collection(&query.lookup.child_collection)?;
        let anchor = query.lookup.anchor;
        let child_end = query.child_endpoint();
        let parent = query.parent.id.as_str();

        Ok(edges
            .iter()
            .filter(|edge| edge.endpoint(anchor) == parent)
            .filter_map(|edge| {
                let child = edge.endpoint(child_end);
                taxa.iter().find(|doc| doc.id == child)
            })
            .map(|doc| doc.to_node(&query.lookup.child_rank))
            .collect())
    }

    async fn fetch_taxon(&self, query: &DetailQuery) -> Result<TaxonRecord, TaxoError> {
        self.check_available()?;
        self.collection(&query.collection)?
            .iter()
            .find(|doc| doc.id == query.id.as_str())
            .map(|doc| doc.to_record(&query.rank))
            .ok_or_else(|| TaxoError::NotFound(format!("taxon '{}'", query.id)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use taxoscope_core::{RankHierarchy, RankLevel, TaxonId};

    fn taxon(id: &str, name: &str) -> StoredTaxon {
        StoredTaxon {
            id: id.to_string(),
            name: name.to_string(),
            rank: None,
            url: None,
            summary: None,
            image: None,
        }
    }

    fn edge(from: &str, to: &str) -> StoredEdge {
        StoredEdge {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn store() -> MemoryStore {
        let mut fixture = Fixture::default();
        fixture.collections.insert(
            "kingdomTaxa".to_string(),
            vec![taxon("kingdomTaxa/1", "Animalia")],
        );
        fixture.collections.insert(
            "phylumTaxa".to_string(),
            vec![
                taxon("phylumTaxa/2", "Chordata"),
                taxon("phylumTaxa/3", "Arthropoda"),
            ],
        );
        fixture.edges.insert(
            "kingdomMembers".to_string(),
            vec![
                edge("phylumTaxa/3", "kingdomTaxa/1"),
                edge("phylumTaxa/2", "kingdomTaxa/1"),
                edge("phylumTaxa/404", "kingdomTaxa/1"),
            ],
        );
        MemoryStore::new(fixture)
    }

    fn animalia() -> TaxonNode {
        TaxonNode::new("kingdomTaxa/1", "Animalia", "kingdom")
    }

    #[tokio::test]
    async fn children_follow_edge_order_and_skip_missing() {
        let table = RankHierarchy::standard();
        let query = ChildQuery::resolve(&table, &animalia())
            .expect("known")
            .expect("not terminal");
        let children = store().fetch_children(&query).await.expect("children");

        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Arthropoda", "Chordata"]);
    }

    #[tokio::test]
    async fn reversed_anchor_finds_nothing_in_child_to_parent_edges() {
        let table = RankHierarchy::from_levels(vec![
            RankLevel::conventional("kingdom").with_anchor(Endpoint::From),
            RankLevel::conventional("phylum"),
        ])
        .expect("valid");
        let query = ChildQuery::resolve(&table, &animalia())
            .expect("known")
            .expect("not terminal");
        assert!(store().fetch_children(&query).await.expect("ok").is_empty());
    }

    #[tokio::test]
    async fn missing_root_is_not_found() {
        let query = RootQuery::new(&RankHierarchy::standard(), "Plantae");
        assert!(matches!(
            store().fetch_root(&query).await,
            Err(TaxoError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_edge_collection_is_not_found() {
        let table = RankHierarchy::standard();
        let chordata = TaxonNode::new("phylumTaxa/2", "Chordata", "phylum");
        let query = ChildQuery::resolve(&table, &chordata)
            .expect("known")
            .expect("not terminal");
        assert!(matches!(
            store().fetch_children(&query).await,
            Err(TaxoError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn switched_off_store_is_unavailable() {
        let store = store();
        store.set_available(false);
        let query = DetailQuery::by_id(
            &RankHierarchy::standard(),
            TaxonId::new("kingdomTaxa/1"),
            &"kingdom".into(),
        )
        .expect("known");
        assert!(matches!(
            store.fetch_detail(&query).await,
            Err(TaxoError::StoreUnavailable(_))
        ));

        store.set_available(true);
        assert!(store.fetch_detail(&query).await.is_ok());
    }
}
