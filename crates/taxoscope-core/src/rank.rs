//! # Rank Hierarchy Table
//!
//! Static, ordered mapping from a taxonomic rank to its child rank and to the
//! names of the store collections that hold it.
//!
//! The table is the ONLY place collection names are derived. Everything that
//! talks to the store asks the table; nothing formats `<rank>Taxa` on its own.
//!
//! ## Naming convention
//!
//! | rank    | entity collection | membership edges                      |
//! |---------|-------------------|---------------------------------------|
//! | kingdom | `kingdomTaxa`     | `kingdomMembers` (phylum → kingdom)   |
//! | ...     | ...               | ...                                   |
//! | species | `speciesTaxa`     | `speciesMembers` (unused, terminal)   |
//!
//! A rank's membership-edge collection holds the edges from the *next lower*
//! rank into it. Which endpoint of those edges carries the parent id is an
//! explicit per-rank setting (`Endpoint`), never inferred.

use crate::{Rank, TaxoError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The seven principal ranks, top to bottom.
pub const STANDARD_RANKS: [&str; 7] = [
    "kingdom", "phylum", "class", "order", "family", "genus", "species",
];

/// Suffix of per-rank entity collections.
pub const TAXA_SUFFIX: &str = "Taxa";

/// Suffix of per-rank membership-edge collections.
pub const MEMBERS_SUFFIX: &str = "Members";

// =============================================================================
// EDGE ENDPOINT
// =============================================================================

/// One end of a stored membership edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    /// The `_from` attribute.
    From,
    /// The `_to` attribute.
    To,
}

impl Endpoint {
    /// Document attribute holding this endpoint.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::From => "_from",
            Self::To => "_to",
        }
    }

    /// The opposite endpoint.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::From => Self::To,
            Self::To => Self::From,
        }
    }
}

// =============================================================================
// LEVELS
// =============================================================================

/// One row of the hierarchy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankLevel {
    /// The rank this row describes.
    pub rank: Rank,
    /// Collection holding taxa of this rank.
    pub entity_collection: String,
    /// Collection holding edges from the next lower rank into this rank.
    pub edge_collection: String,
    /// Endpoint of `edge_collection` documents that holds this rank's (parent) id.
    pub anchor: Endpoint,
}

impl RankLevel {
    /// Build a level following the `<rank>Taxa` / `<rank>Members` convention.
    ///
    /// Edges are stored child → parent, so the parent sits at `_to`.
    #[must_use]
    pub fn conventional(rank: impl Into<Rank>) -> Self {
        let rank = rank.into();
        Self {
            entity_collection: format!("{}{}", rank, TAXA_SUFFIX),
            edge_collection: format!("{}{}", rank, MEMBERS_SUFFIX),
            anchor: Endpoint::To,
            rank,
        }
    }

    /// Override the anchor endpoint.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Endpoint) -> Self {
        self.anchor = anchor;
        self
    }
}

/// Everything needed to fetch the children of a taxon of some rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildLookup {
    /// Rank of the node being expanded.
    pub parent_rank: Rank,
    /// Rank of the children.
    pub child_rank: Rank,
    /// Membership-edge collection linking children into the parent rank.
    pub edge_collection: String,
    /// Entity collection holding the children.
    pub child_collection: String,
    /// Endpoint of the edge documents holding the parent id.
    pub anchor: Endpoint,
}

// =============================================================================
// RANK HIERARCHY
// =============================================================================

/// Ordered rank table, top (root) rank first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankHierarchy {
    levels: Vec<RankLevel>,
}

impl Default for RankHierarchy {
    fn default() -> Self {
        Self::standard()
    }
}

impl RankHierarchy {
    /// Kingdom through species with conventional collection names.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            levels: STANDARD_RANKS
                .iter()
                .map(|r| RankLevel::conventional(*r))
                .collect(),
        }
    }

    /// Build a table from explicit levels, top rank first.
    ///
    /// Rejects an empty table, duplicate ranks and blank collection names.
    pub fn from_levels(levels: Vec<RankLevel>) -> Result<Self, TaxoError> {
        if levels.is_empty() {
            return Err(TaxoError::InvalidConfig(
                "rank hierarchy has no levels".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for level in &levels {
            if level.rank.as_str().is_empty() {
                return Err(TaxoError::InvalidConfig("blank rank name".to_string()));
            }
            if !seen.insert(level.rank.clone()) {
                return Err(TaxoError::InvalidConfig(format!(
                    "rank '{}' listed twice",
                    level.rank
                )));
            }
            if level.entity_collection.trim().is_empty() || level.edge_collection.trim().is_empty()
            {
                return Err(TaxoError::InvalidConfig(format!(
                    "rank '{}' has a blank collection name",
                    level.rank
                )));
            }
        }

        Ok(Self { levels })
    }

    /// All levels, top rank first.
    #[must_use]
    pub fn levels(&self) -> &[RankLevel] {
        &self.levels
    }

    /// The top rank (where the root taxon lives).
    #[must_use]
    pub fn root_level(&self) -> &RankLevel {
        // from_levels/standard guarantee at least one level
        &self.levels[0]
    }

    /// Position of a rank in the table (0 = root rank).
    #[must_use]
    pub fn depth(&self, rank: &Rank) -> Option<usize> {
        self.levels.iter().position(|l| &l.rank == rank)
    }

    /// Row for a rank.
    pub fn level(&self, rank: &Rank) -> Result<&RankLevel, TaxoError> {
        self.levels
            .iter()
            .find(|l| &l.rank == rank)
            .ok_or_else(|| TaxoError::UnknownRank(rank.clone()))
    }

    /// The next lower rank, `Ok(None)` for the terminal rank.
    pub fn next_rank(&self, rank: &Rank) -> Result<Option<&Rank>, TaxoError> {
        let depth = self
            .depth(rank)
            .ok_or_else(|| TaxoError::UnknownRank(rank.clone()))?;
        Ok(self.levels.get(depth + 1).map(|l| &l.rank))
    }

    /// Entity collection for taxa of `rank`.
    pub fn entity_collection(&self, rank: &Rank) -> Result<&str, TaxoError> {
        self.level(rank).map(|l| l.entity_collection.as_str())
    }

    /// Membership-edge collection pointing into `rank`.
    pub fn edge_collection(&self, rank: &Rank) -> Result<&str, TaxoError> {
        self.level(rank).map(|l| l.edge_collection.as_str())
    }

    /// Which endpoint of `rank`'s membership edges holds the parent id.
    pub fn anchor(&self, rank: &Rank) -> Result<Endpoint, TaxoError> {
        self.level(rank).map(|l| l.anchor)
    }

    /// Resolve where the children of a `rank` taxon live.
    ///
    /// `Ok(None)` means the rank is terminal. An unrecognized rank is an
    /// error, never "no children".
    pub fn child_lookup(&self, rank: &Rank) -> Result<Option<ChildLookup>, TaxoError> {
        let parent = self.level(rank)?;
        let Some(child_rank) = self.next_rank(rank)? else {
            return Ok(None);
        };
        let child = self.level(child_rank)?;

        Ok(Some(ChildLookup {
            parent_rank: parent.rank.clone(),
            child_rank: child.rank.clone(),
            edge_collection: parent.edge_collection.clone(),
            child_collection: child.entity_collection.clone(),
            anchor: parent.anchor,
        }))
    }

    /// Rank whose entity collection is `collection`.
    #[must_use]
    pub fn rank_of_collection(&self, collection: &str) -> Option<&Rank> {
        self.levels
            .iter()
            .find(|l| l.entity_collection == collection)
            .map(|l| &l.rank)
    }
}

// =============================================================================
// TESTS
// =============================================================================
