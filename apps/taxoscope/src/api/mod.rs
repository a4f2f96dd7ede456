//! # Taxoscope HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/v1/root` - The root taxon
//! - `GET /api/v1/taxon/{rank}/{key}` - One taxon with summary and image
//! - `GET /api/v1/taxon/{rank}/{key}/children` - Immediate children
//! - `GET /api/v1/ranks` - The rank hierarchy table
//! - `POST /api/v1/session/gesture` - Click / pointer-enter / pointer-leave
//! - `POST /api/v1/session/reload` - Retry the root fetch
//! - `GET /api/v1/session/graph` - Session snapshot
//! - `GET /api/v1/session/events` - Server-sent session events
//!
//! With `server.static_dir` set, the renderer bundle is served at `/`.

mod handlers;
mod middleware;
mod types;

pub use handlers::{
    children_handler, events_handler, gesture_handler, graph_handler, health_handler,
    ranks_handler, reload_handler, root_handler, taxon_handler,
};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ApiError, ChildrenResponse, ErrorResponse, GestureResponse, HealthResponse, RanksResponse,
    api_error, status_for,
};

use crate::config::ServerConfig;
use crate::session::SessionHandle;
use crate::store::TaxonomyGateway;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use taxoscope_core::TaxoError;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// Stateless lookups for the REST routes.
    pub gateway: TaxonomyGateway,
    /// The interactive session.
    pub session: SessionHandle,
    /// Server settings.
    pub server: Arc<ServerConfig>,
}

impl AppState {
    /// Create app state.
    #[must_use]
    pub fn new(gateway: TaxonomyGateway, session: SessionHandle, server: ServerConfig) -> Self {
        Self {
            gateway,
            session,
            server: Arc::new(server),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from `server.cors_origins`.
///
/// - `["*"]`: any origin
/// - otherwise: exactly the listed origins; unparseable entries are skipped
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o.trim() == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            let trimmed = origin.trim();
            match trimmed.parse::<HeaderValue>() {
                Ok(hv) => {
                    tracing::info!("CORS: Allowing origin: {}", trimmed);
                    Some(hv)
                }
                Err(e) => {
                    tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("CORS: No valid origins configured, cross-origin requests are refused");
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/v1/root", get(handlers::root_handler))
        .route("/api/v1/ranks", get(handlers::ranks_handler))
        .route("/api/v1/taxon/{rank}/{key}", get(handlers::taxon_handler))
        .route(
            "/api/v1/taxon/{rank}/{key}/children",
            get(handlers::children_handler),
        )
        .route("/api/v1/session/gesture", post(handlers::gesture_handler))
        .route("/api/v1/session/reload", post(handlers::reload_handler))
        .route("/api/v1/session/graph", get(handlers::graph_handler))
        .route("/api/v1/session/events", get(handlers::events_handler));

    if let Some(dir) = &state.server.static_dir {
        tracing::info!("Serving renderer assets from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    with_middleware(router, &state.server).with_state(state)
}

/// Wrap `router` in the middleware stack.
///
/// Outer to inner:
/// 1. Tracing - logs all requests
/// 2. Panic recovery - a panicking handler becomes a 500
/// 3. CORS - handles preflight requests
/// 4. Compression - gzip responses
/// 5. Rate Limiting - global request budget (if enabled)
fn with_middleware<S>(mut router: Router<S>, server: &ServerConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    match create_rate_limiter(server.rate_limit) {
        Some(limiter) => {
            tracing::info!("Rate limiting enabled: {} requests/second", server.rate_limit);
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new())
                .layer(build_cors_layer(&server.cors_origins))
                .layer(CompressionLayer::new()),
        )
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and the session's root fetch.
pub async fn run_server(state: AppState) -> Result<(), TaxoError> {
    let addr = state.server.addr();
    state.session.start().await?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TaxoError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Taxoscope HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TaxoError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

// =============================================================================
// TESTS
// =============================================================================
