use crate::{AppState, handlers, service::Resource};
use axum::{Router, routing::post};

/// Authenticated Router Module
///
/// Endpoints open to any caller holding a valid bearer token. Relies on the
/// `authenticate` layer added in `resource_routes`.
pub fn authenticated_routes<R: Resource>() -> Router<AppState> {
    Router::new()
        // POST /
        // Creates a record. Sensitive fields are encrypted before they reach the store.
        .route("/", post(handlers::create_resource::<R>))
}
