//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use axum::Json;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use taxoscope_core::{RankLevel, TaxoError, TaxonNode};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Store backend in use ("arangodb", "memory").
    pub backend: String,
}

impl HealthResponse {
    /// Healthy response for `backend`.
    #[must_use]
    pub fn ok(backend: &str) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            backend: backend.to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Error body: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error: status code plus JSON body.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// HTTP status for a `TaxoError`.
#[must_use]
pub fn status_for(error: &TaxoError) -> StatusCode {
    match error {
        TaxoError::NotFound(_) => StatusCode::NOT_FOUND,
        TaxoError::UnknownRank(_) | TaxoError::InvalidGesture(_) => StatusCode::BAD_REQUEST,
        TaxoError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        TaxoError::DanglingEdge { .. }
        | TaxoError::Cycle { .. }
        | TaxoError::StaleCompletion(_)
        | TaxoError::InvalidConfig(_)
        | TaxoError::SerializationError(_)
        | TaxoError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a `TaxoError` into a handler error, logging server-side failures.
#[must_use]
pub fn api_error(error: TaxoError) -> ApiError {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::warn!("Request failed ({}): {}", status, error);
    } else {
        tracing::debug!("Request rejected ({}): {}", status, error);
    }
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

// =============================================================================
// TAXON RESPONSES
// =============================================================================

/// Children of one taxon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildrenResponse {
    pub parent: TaxonNode,
    pub children: Vec<TaxonNode>,
}

/// The rank table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RanksResponse {
    pub ranks: Vec<RankLevel>,
}

// =============================================================================
// SESSION RESPONSES
// =============================================================================

/// Response to an accepted gesture or reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureResponse {
    pub accepted: bool,
    /// Store fetches the request started.
    pub fetches: usize,
}

// =============================================================================
// TESTS
// =============================================================================
