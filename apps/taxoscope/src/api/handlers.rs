//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ApiError, ChildrenResponse, GestureResponse, HealthResponse, RanksResponse, api_error,
    },
};
use crate::session::{GestureAck, SessionEvent, SessionSnapshot, event_stream};
use crate::store::TaxonRecord;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt};
use taxoscope_core::{Gesture, Rank, TaxonNode};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse::ok(state.gateway.store().backend()))
}

// =============================================================================
// TAXON HANDLERS
// =============================================================================

/// The root taxon.
pub async fn root_handler(State(state): State<AppState>) -> Result<Json<TaxonNode>, ApiError> {
    state.gateway.fetch_root().await.map(Json).map_err(api_error)
}

/// One taxon with its overlay content.
pub async fn taxon_handler(
    State(state): State<AppState>,
    Path((rank, key)): Path<(String, String)>,
) -> Result<Json<TaxonRecord>, ApiError> {
    state
        .gateway
        .fetch_taxon(&Rank::new(rank), &key)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Immediate children of one taxon. An absent parent is a 404, not an
/// empty list.
pub async fn children_handler(
    State(state): State<AppState>,
    Path((rank, key)): Path<(String, String)>,
) -> Result<Json<ChildrenResponse>, ApiError> {
    let parent = state
        .gateway
        .fetch_taxon(&Rank::new(rank), &key)
        .await
        .map_err(api_error)?
        .node;
    let children = state
        .gateway
        .fetch_children(&parent)
        .await
        .map_err(api_error)?;

    Ok(Json(ChildrenResponse { parent, children }))
}

/// The rank hierarchy table.
pub async fn ranks_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(RanksResponse {
        ranks: state.gateway.hierarchy().levels().to_vec(),
    })
}

// =============================================================================
// SESSION HANDLERS
// =============================================================================

fn accepted(ack: GestureAck) -> (StatusCode, Json<GestureResponse>) {
    (
        StatusCode::ACCEPTED,
        Json(GestureResponse {
            accepted: true,
            fetches: ack.fetches,
        }),
    )
}

/// Apply a click / pointer-enter / pointer-leave.
pub async fn gesture_handler(
    State(state): State<AppState>,
    Json(gesture): Json<Gesture>,
) -> Result<(StatusCode, Json<GestureResponse>), ApiError> {
    state
        .session
        .gesture(gesture)
        .await
        .map(accepted)
        .map_err(api_error)
}

/// Re-issue the root fetch if the root is not loaded.
pub async fn reload_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<GestureResponse>), ApiError> {
    state.session.start().await.map(accepted).map_err(api_error)
}

/// Graph, expansion states and overlay of the session.
pub async fn graph_handler(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    state.session.snapshot().await.map(Json).map_err(api_error)
}

/// Server-sent stream of session events.
///
/// A `resync` frame means events were dropped for this client; it should
/// re-read `/api/v1/session/graph`.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = event_stream(state.session.subscribe()).map(|event| encode(&event));
    Sse::new(events).keep_alive(KeepAlive::default())
}

fn encode(event: &SessionEvent) -> Result<Event, axum::Error> {
    Event::default().json_data(event)
}
