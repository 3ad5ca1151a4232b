use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    routing::get,
};
use std::{sync::Arc, time::Instant};

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

// Routing segregated by access tier (public, authenticated, admin).
pub mod routes;

// --- Public Re-exports ---

pub use auth::{AuthPolicy, AuthUser, IdentityState};
pub use config::AppConfig;
pub use crypto::{CipherState, FieldCipher};
pub use error::ApiError;
pub use repository::{DocumentStoreState, InMemoryDocumentStore, PostgresDocumentStore};
pub use service::{Movies, Promotions, Resource, ResourceService, Reviews};

/// AppState
///
/// Single, immutable container for everything a request may need. Cloned per
/// request (all members are `Arc`s or `Copy`).
#[derive(Clone)]
pub struct AppState {
    /// Document store adapter; the only source of truth for records.
    pub store: DocumentStoreState,
    /// Field cipher holding the process-wide key (read-only after startup).
    pub cipher: CipherState,
    /// External token verifier.
    pub identity: IdentityState,
    /// Process start, reported by the health check.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        store: DocumentStoreState,
        cipher: FieldCipher,
        identity: IdentityState,
    ) -> Self {
        Self {
            store,
            cipher: Arc::new(cipher),
            identity,
            started_at: Instant::now(),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Handlers and extractors pull only the component they need out of AppState.

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl<R: Resource> FromRef<AppState> for ResourceService<R> {
    fn from_ref(app_state: &AppState) -> ResourceService<R> {
        ResourceService::new(app_state.store.clone(), app_state.cipher.clone())
    }
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .route("/api/v1/health", get(handlers::health))
        .nest(
            "/api/v1/movies",
            routes::resource_routes::<Movies>(state.clone()),
        )
        .nest(
            "/api/v1/promotions",
            routes::resource_routes::<Promotions>(state.clone()),
        )
        .nest(
            "/api/v1/reviews",
            routes::resource_routes::<Reviews>(state.clone()),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Generate a UUID request id for every incoming request.
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                // 3b. Wrap the request/response lifecycle in a tracing span.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Echo the request id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span with method, URI and the `x-request-id`, so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
