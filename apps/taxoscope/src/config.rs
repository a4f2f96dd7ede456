//! # Configuration
//!
//! TOML configuration with environment overrides.
//!
//! ```toml
//! [database]
//! url = "http://localhost:8529"
//! user = "root"
//! password = ""
//! name = "_system"
//!
//! [root]
//! name = "Animalia"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! cors_origins = ["http://localhost:5173"]
//! rate_limit = 100
//!
//! [[ranks]]
//! rank = "kingdom"
//! anchor = "to"
//! ```
//!
//! Every field has a default, so an empty file (or no file) is valid.
//! An empty `[[ranks]]` list means the standard kingdom-to-species table.
//!
//! ## Environment Overrides
//!
//! - `TAXOSCOPE_DATABASE_URL`, `TAXOSCOPE_DATABASE_USER`,
//!   `TAXOSCOPE_DATABASE_PASSWORD`, `TAXOSCOPE_DATABASE_NAME`
//! - `TAXOSCOPE_ROOT_NAME`: name of the root taxon
//! - `TAXOSCOPE_CORS_ORIGINS`: comma-separated origins, or `*`
//! - `TAXOSCOPE_RATE_LIMIT`: requests per second, 0 disables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use taxoscope_core::{Endpoint, RankHierarchy, RankLevel, TaxoError};

/// Default number of rows per ArangoDB cursor batch.
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

/// Default requests per second for the HTTP API.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// CONFIG STRUCTURE
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub root: RootConfig,
    pub server: ServerConfig,
    pub ranks: Vec<RankConfig>,
}

/// Connection to the taxonomy store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Base URL of the ArangoDB HTTP endpoint.
    pub url: String,
    pub user: String,
    pub password: String,
    /// Database holding the taxa and membership collections.
    pub name: String,
    /// Rows per cursor batch.
    pub batch_size: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8529".to_string(),
            user: "root".to_string(),
            password: String::new(),
            name: "_system".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout_secs: 10,
        }
    }
}

/// The distinguished root taxon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// Value of the root's `name` field.
    pub name: String,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            name: "Animalia".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `["*"]` allows any.
    pub cors_origins: Vec<String>,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Directory of static renderer assets served at `/`.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            rate_limit: DEFAULT_RATE_LIMIT,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One row of the rank table. Unset collection names follow the
/// `<rank>Taxa` / `<rank>Members` convention; the anchor defaults to `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankConfig {
    pub rank: String,
    #[serde(default)]
    pub entity_collection: Option<String>,
    #[serde(default)]
    pub edge_collection: Option<String>,
    #[serde(default)]
    pub anchor: Option<Endpoint>,
}

impl RankConfig {
    fn to_level(&self) -> RankLevel {
        let mut level = RankLevel::conventional(self.rank.as_str());
        if let Some(entity) = &self.entity_collection {
            level.entity_collection = entity.clone();
        }
        if let Some(edge) = &self.edge_collection {
            level.edge_collection = edge.clone();
        }
        if let Some(anchor) = self.anchor {
            level = level.with_anchor(anchor);
        }
        level
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TaxoError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TaxoError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, TaxoError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| TaxoError::InvalidConfig(format!("Malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` (or defaults when absent), then apply the process
    /// environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self, TaxoError> {
        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                Self::from_file(path)?
            }
            None => {
                tracing::debug!("No config file given, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `TAXOSCOPE_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TAXOSCOPE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(user) = lookup("TAXOSCOPE_DATABASE_USER") {
            self.database.user = user;
        }
        if let Some(password) = lookup("TAXOSCOPE_DATABASE_PASSWORD") {
            self.database.password = password;
        }
        if let Some(name) = lookup("TAXOSCOPE_DATABASE_NAME") {
            self.database.name = name;
        }
        if let Some(root) = lookup("TAXOSCOPE_ROOT_NAME") {
            self.root.name = root;
        }
        if let Some(origins) = lookup("TAXOSCOPE_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(limit) = lookup("TAXOSCOPE_RATE_LIMIT") {
            match limit.trim().parse() {
                Ok(rps) => self.server.rate_limit = rps,
                Err(_) => tracing::warn!("Ignoring invalid TAXOSCOPE_RATE_LIMIT '{}'", limit),
            }
        }
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), TaxoError> {
        if self.database.url.trim().is_empty() {
            return Err(TaxoError::InvalidConfig("database.url is empty".to_string()));
        }
        if self.database.name.trim().is_empty() {
            return Err(TaxoError::InvalidConfig("database.name is empty".to_string()));
        }
        if self.database.batch_size == 0 {
            return Err(TaxoError::InvalidConfig(
                "database.batch_size must be > 0".to_string(),
            ));
        }
        if self.root.name.trim().is_empty() {
            return Err(TaxoError::InvalidConfig("root.name is empty".to_string()));
        }
        self.hierarchy().map(|_| ())
    }

    /// The rank table described by `[[ranks]]`, or the standard one.
    pub fn hierarchy(&self) -> Result<RankHierarchy, TaxoError> {
        if self.ranks.is_empty() {
            return Ok(RankHierarchy::standard());
        }
        RankHierarchy::from_levels(self.ranks.iter().map(RankConfig::to_level).collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use taxoscope_core::Rank;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = Config::parse("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.root.name, "Animalia");
        assert_eq!(config.hierarchy().expect("table"), RankHierarchy::standard());
    }

    #[test]
    fn rank_rows_override_collections_and_anchor() {
        let config = Config::parse(
            r#"
            [[ranks]]
            rank = "Kingdom"
            anchor = "from"

            [[ranks]]
            rank = "phylum"
            entity_collection = "phyla"
            "#,
        )
        .expect("parse");

        let table = config.hierarchy().expect("table");
        assert_eq!(table.depth(&Rank::new("phylum")), Some(1));
        assert_eq!(table.anchor(&Rank::new("kingdom")).expect("kingdom"), Endpoint::From);
        assert_eq!(table.entity_collection(&Rank::new("phylum")).expect("phylum"), "phyla");
        assert_eq!(table.edge_collection(&Rank::new("phylum")).expect("phylum"), "phylumMembers");
    }

    #[test]
    fn duplicate_rank_rows_are_rejected() {
        let result = Config::parse(
            r#"
            [[ranks]]
            rank = "genus"
            [[ranks]]
            rank = "Genus"
            "#,
        );
        assert!(matches!(result, Err(TaxoError::InvalidConfig(_))));
    }

    #[test]
    fn overrides_take_precedence() {
        let env: BTreeMap<&str, &str> = [
            ("TAXOSCOPE_DATABASE_URL", "http://arango:8529"),
            ("TAXOSCOPE_ROOT_NAME", "Plantae"),
            ("TAXOSCOPE_CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("TAXOSCOPE_RATE_LIMIT", "0"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.database.url, "http://arango:8529");
        assert_eq!(config.root.name, "Plantae");
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.server.rate_limit, 0);
    }

    #[test]
    fn invalid_rate_limit_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "TAXOSCOPE_RATE_LIMIT").then(|| "fast".to_string()));
        assert_eq!(config.server.rate_limit, DEFAULT_RATE_LIMIT);
    }

    #[test]
    fn zero_batch_size_is_invalid() {
        let result = Config::parse("[database]\nbatch_size = 0\n");
        assert!(matches!(result, Err(TaxoError::InvalidConfig(_))));
    }
}
