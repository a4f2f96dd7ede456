//! # ArangoDB Store
//!
//! Runs AQL through the HTTP cursor API:
//!
//! - `POST /_db/{db}/_api/cursor` with `{ query, bindVars, batchSize }`
//! - `PUT /_db/{db}/_api/cursor/{id}` while the response says `hasMore`
//! - `DELETE /_db/{db}/_api/cursor/{id}` when a page fails before the
//!   cursor is drained
//!
//! ## Error Mapping
//!
//! | condition                                 | error                |
//! |-------------------------------------------|----------------------|
//! | connection failure, 401/403, 5xx          | `StoreUnavailable`   |
//! | 404 or errorNum 1203 (no such collection) | `NotFound`           |
//! | body that does not decode                 | `SerializationError` |

use super::{StoredTaxon, TaxonRecord, TaxonomyStore};
use crate::config::DatabaseConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use taxoscope_core::{Aql, ChildQuery, DetailQuery, Rank, RootQuery, TaxoError, TaxonNode};

/// ArangoDB "collection or view not found".
const ERROR_DATA_SOURCE_NOT_FOUND: i64 = 1203;

/// One page of a cursor.
#[derive(Debug, Deserialize)]
struct CursorPage {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default, rename = "hasMore")]
    has_more: bool,
    #[serde(default)]
    id: Option<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, rename = "errorNum")]
    error_num: Option<i64>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

/// Map a failed response to a `TaxoError`.
fn classify(status: reqwest::StatusCode, body: &str) -> TaxoError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error_message
        .unwrap_or_else(|| body.trim().to_string());

    if status == reqwest::StatusCode::NOT_FOUND
        || parsed.error_num == Some(ERROR_DATA_SOURCE_NOT_FOUND)
    {
        return TaxoError::NotFound(message);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return TaxoError::StoreUnavailable(format!("access denied ({}): {}", status, message));
    }
    if status.is_server_error() {
        return TaxoError::StoreUnavailable(format!("server error ({}): {}", status, message));
    }
    TaxoError::StoreUnavailable(format!("request rejected ({}): {}", status, message))
}

fn decode<T: DeserializeOwned>(row: Value) -> Result<T, TaxoError> {
    serde_json::from_value(row)
        .map_err(|e| TaxoError::SerializationError(format!("Undecodable document: {}", e)))
}

// =============================================================================
// CLIENT
// =============================================================================

/// Store that talks to ArangoDB over HTTP.
#[derive(Clone)]
pub struct ArangoStore {
    http: reqwest::Client,
    base_url: String,
    database: String,
    user: String,
    password: String,
    batch_size: u32,
}

impl ArangoStore {
    /// Create a client for the configured database.
    pub fn new(config: &DatabaseConfig) -> Result<Self, TaxoError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TaxoError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            database: config.name.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            batch_size: config.batch_size,
        })
    }

    fn cursor_url(&self) -> String {
        format!("{}/_db/{}/_api/cursor", self.base_url, self.database)
    }

    /// Build a request with basic auth.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.user, Some(&self.password))
    }

    /// Send a request and map connection errors.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, TaxoError> {
        req.send().await.map_err(|e| {
            TaxoError::StoreUnavailable(format!("cannot reach {}: {}", self.base_url, e))
        })
    }

    /// Check the status and decode one cursor page.
    async fn handle_response(&self, resp: reqwest::Response) -> Result<CursorPage, TaxoError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }
        resp.json::<CursorPage>()
            .await
            .map_err(|e| TaxoError::SerializationError(format!("Malformed cursor page: {}", e)))
    }

    async fn fetch_page(&self, req: reqwest::RequestBuilder) -> Result<CursorPage, TaxoError> {
        self.handle_response(self.send(req).await?).await
    }

    /// Release a cursor that will not be drained. Failure only costs the
    /// server-side TTL, so it is logged and otherwise ignored.
    async fn close_cursor(&self, url: &str) {
        match self.request(reqwest::Method::DELETE, url).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!("Closed cursor {}", url);
            }
            Ok(resp) => tracing::warn!("Cursor {} not closed: {}", url, resp.status()),
            Err(e) => tracing::warn!("Cursor {} not closed: {}", url, e),
        }
    }

    /// Run a query and drain its cursor.
    async fn run(&self, aql: &Aql) -> Result<Vec<Value>, TaxoError> {
        let body = json!({
            "query": aql.query,
            "bindVars": aql.bind_vars,
            "batchSize": self.batch_size,
        });
        let req = self
            .request(reqwest::Method::POST, &self.cursor_url())
            .json(&body);
        let mut page = self.fetch_page(req).await?;
        let mut rows = std::mem::take(&mut page.result);

        while page.has_more {
            let Some(id) = page.id.take() else {
                return Err(TaxoError::SerializationError(
                    "cursor has more rows but no id".to_string(),
                ));
            };
            let url = format!("{}/{}", self.cursor_url(), id);
            page = match self.fetch_page(self.request(reqwest::Method::PUT, &url)).await {
                Ok(next) => next,
                Err(e) => {
                    self.close_cursor(&url).await;
                    return Err(e);
                }
            };
            rows.append(&mut page.result);
        }

        tracing::debug!(rows = rows.len(), "AQL: {}", aql.query);
        Ok(rows)
    }

    async fn first(&self, aql: &Aql) -> Result<Option<StoredTaxon>, TaxoError> {
        self.run(aql)
            .await?
            .into_iter()
            .next()
            .map(decode::<StoredTaxon>)
            .transpose()
    }
}

#[async_trait]
impl TaxonomyStore for ArangoStore {
    fn backend(&self) -> &'static str {
        "arangodb"
    }

    async fn fetch_root(&self, query: &RootQuery) -> Result<TaxonNode, TaxoError> {
        self.first(&query.to_aql())
            .await?
            .map(|doc| doc.to_node(&query.rank))
            .ok_or_else(|| {
                TaxoError::NotFound(format!(
                    "root taxon '{}' in {}",
                    query.name, query.collection
                ))
            })
    }

    async fn fetch_children(&self, query: &ChildQuery) -> Result<Vec<TaxonNode>, TaxoError> {
        let rank: &Rank = &query.lookup.child_rank;
        self.run(&query.to_aql())
            .await?
            .into_iter()
            .map(|row| decode::<StoredTaxon>(row).map(|doc| doc.to_node(rank)))
            .collect()
    }

    async fn fetch_taxon(&self, query: &DetailQuery) -> Result<TaxonRecord, TaxoError> {
        self.first(&query.to_aql())
            .await?
            .map(|doc| doc.to_record(&query.rank))
            .ok_or_else(|| TaxoError::NotFound(format!("taxon '{}'", query.id)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
