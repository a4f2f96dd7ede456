//! # Taxonomy Store Gateway
//!
//! Executes the query shapes built in `taxoscope-core::query` against a
//! backing store.
//!
//! ## Backends
//!
//! - `ArangoStore`: ArangoDB over its HTTP cursor API
//! - `MemoryStore`: collections held in memory, loaded from a JSON fixture
//!
//! Failures are `StoreUnavailable` or `NotFound`, never an empty success.

mod arango;
mod memory;

pub use arango::ArangoStore;
pub use memory::{Fixture, MemoryStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taxoscope_core::{
    ChildQuery, DetailQuery, Rank, RankHierarchy, RootQuery, TaxoError, TaxonDetail, TaxonId,
    TaxonNode,
};

// =============================================================================
// RECORDS
// =============================================================================

/// A taxon document as the crawler stores it.
///
/// `rank` is written in title case ("Phylum") and may be absent; `summary`
/// and `image` are filled in by the enrichment pass when available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTaxon {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl StoredTaxon {
    /// Graph node for this document; a missing rank falls back to the rank
    /// of the collection it was read from.
    #[must_use]
    pub fn to_node(&self, collection_rank: &Rank) -> TaxonNode {
        let rank = self
            .rank
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map_or_else(|| collection_rank.clone(), Rank::new);
        TaxonNode::new(self.id.as_str(), self.name.as_str(), rank)
    }

    /// Overlay content for this document.
    #[must_use]
    pub fn to_detail(&self) -> TaxonDetail {
        TaxonDetail {
            summary: self.summary.clone().unwrap_or_default(),
            image: self.image.clone(),
            url: self.url.clone(),
        }
    }

    /// Node and detail together.
    #[must_use]
    pub fn to_record(&self, collection_rank: &Rank) -> TaxonRecord {
        TaxonRecord {
            node: self.to_node(collection_rank),
            detail: self.to_detail(),
        }
    }
}

/// One taxon with its overlay content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonRecord {
    #[serde(flatten)]
    pub node: TaxonNode,
    pub detail: TaxonDetail,
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// A backend able to answer the three taxonomy lookups.
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// The single taxon selected by name in the root rank's collection.
    async fn fetch_root(&self, query: &RootQuery) -> Result<TaxonNode, TaxoError>;

    /// Children of `query.parent`, in store order.
    async fn fetch_children(&self, query: &ChildQuery) -> Result<Vec<TaxonNode>, TaxoError>;

    /// One taxon by id, with its overlay content.
    async fn fetch_taxon(&self, query: &DetailQuery) -> Result<TaxonRecord, TaxoError>;

    /// Overlay content of one taxon.
    async fn fetch_detail(&self, query: &DetailQuery) -> Result<TaxonDetail, TaxoError> {
        self.fetch_taxon(query).await.map(|record| record.detail)
    }
}

// =============================================================================
// GATEWAY
// =============================================================================

/// Node-level entry point to a store: resolves collections through the rank
/// table, then runs the query.
#[derive(Clone)]
pub struct TaxonomyGateway {
    store: Arc<dyn TaxonomyStore>,
    hierarchy: Arc<RankHierarchy>,
    root_name: Arc<str>,
}

impl TaxonomyGateway {
    /// Create a gateway over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn TaxonomyStore>,
        hierarchy: RankHierarchy,
        root_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            hierarchy: Arc::new(hierarchy),
            root_name: Arc::from(root_name.into()),
        }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn TaxonomyStore> {
        Arc::clone(&self.store)
    }

    /// The rank table.
    #[must_use]
    pub fn hierarchy(&self) -> &RankHierarchy {
        &self.hierarchy
    }

    /// Name of the root taxon.
    #[must_use]
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Fetch the root taxon.
    pub async fn fetch_root(&self) -> Result<TaxonNode, TaxoError> {
        let query = RootQuery::new(&self.hierarchy, self.root_name.as_ref());
        self.store.fetch_root(&query).await
    }

    /// Fetch the children of `node`; empty for a terminal-rank node.
    pub async fn fetch_children(&self, node: &TaxonNode) -> Result<Vec<TaxonNode>, TaxoError> {
        match ChildQuery::resolve(&self.hierarchy, node)? {
            Some(query) => self.store.fetch_children(&query).await,
            None => Ok(Vec::new()),
        }
    }

    /// Fetch overlay content for `node`.
    pub async fn fetch_detail(&self, node: &TaxonNode) -> Result<TaxonDetail, TaxoError> {
        let query = DetailQuery::resolve(&self.hierarchy, node)?;
        self.store.fetch_detail(&query).await
    }

    /// Fetch a taxon addressed by rank and document key.
    pub async fn fetch_taxon(&self, rank: &Rank, key: &str) -> Result<TaxonRecord, TaxoError> {
        let collection = self.hierarchy.entity_collection(rank)?;
        let id = TaxonId::from_parts(collection, key);
        let query = DetailQuery::by_id(&self.hierarchy, id, rank)?;
        self.store.fetch_taxon(&query).await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> TaxonomyGateway {
        let fixture: Fixture = serde_json::from_str(
            r#"{
                "collections": {
                    "kingdomTaxa": [{"_id": "kingdomTaxa/1", "name": "Animalia", "rank": "Kingdom"}],
                    "phylumTaxa": [{"_id": "phylumTaxa/2", "name": "Chordata", "summary": "Backbones."}]
                },
                "edges": {
                    "kingdomMembers": [{"_from": "phylumTaxa/2", "_to": "kingdomTaxa/1"}]
                }
            }"#,
        )
        .expect("fixture");
        TaxonomyGateway::new(
            Arc::new(MemoryStore::new(fixture)),
            RankHierarchy::standard(),
            "Animalia",
        )
    }

    #[test]
    fn stored_taxon_rank_falls_back_to_collection() {
        let doc = StoredTaxon {
            id: "genusTaxa/9".to_string(),
            name: "Panthera".to_string(),
            rank: None,
            url: None,
            summary: None,
            image: None,
        };
        assert_eq!(doc.to_node(&Rank::new("genus")).rank, Rank::new("genus"));
    }

    #[test]
    fn stored_taxon_rank_is_lowercased() {
        let doc: StoredTaxon =
            serde_json::from_str(r#"{"_id":"a/1","_key":"1","name":"A","rank":"Order"}"#)
                .expect("decode");
        assert_eq!(doc.to_node(&Rank::new("class")).rank, Rank::new("order"));
    }

    #[tokio::test]
    async fn gateway_walks_root_then_children() {
        let gateway = gateway();
        let root = gateway.fetch_root().await.expect("root");
        assert_eq!(root.name, "Animalia");

        let children = gateway.fetch_children(&root).await.expect("children");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].rank, Rank::new("phylum"));
    }

    #[tokio::test]
    async fn gateway_addresses_taxon_by_rank_and_key() {
        let record = gateway()
            .fetch_taxon(&Rank::new("phylum"), "2")
            .await
            .expect("taxon");
        assert_eq!(record.node.id, TaxonId::new("phylumTaxa/2"));
        assert_eq!(record.detail.summary, "Backbones.");
    }

    #[tokio::test]
    async fn gateway_terminal_node_has_no_children() {
        let leaf = TaxonNode::new("speciesTaxa/1", "Panthera leo", "species");
        assert!(gateway().fetch_children(&leaf).await.expect("ok").is_empty());
    }

    #[tokio::test]
    async fn gateway_unknown_rank_is_an_error() {
        let odd = TaxonNode::new("x/1", "Odd", "clade");
        assert!(matches!(
            gateway().fetch_children(&odd).await,
            Err(TaxoError::UnknownRank(_))
        ));
    }
}
