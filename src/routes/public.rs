use crate::{AppState, handlers, service::Resource};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only endpoints that need no token.
pub fn public_routes<R: Resource>() -> Router<AppState> {
    Router::new()
        // GET /
        // Lists all records, optionally filtered by one of the resource's filter fields.
        .route("/", get(handlers::list_resources::<R>))
        // GET /{id}
        // Retrieves one record; 404 if the id is unknown.
        .route("/{id}", get(handlers::get_resource::<R>))
}
