use crate::{AppState, handlers, service::Resource};
use axum::{Router, routing::put};

/// Admin Router Module
///
/// Mutations of existing records. Wrapped by `authenticate` and then
/// `authorize` with an admin-only policy, so a missing token is a 401 and a
/// non-admin caller is a 403 before the record is ever looked up.
pub fn admin_routes<R: Resource>() -> Router<AppState> {
    Router::new()
        // PUT /{id}
        // Partial update; only fields present in the body change.
        // DELETE /{id}
        // Removes the record; 404 if it does not exist.
        .route(
            "/{id}",
            put(handlers::update_resource::<R>).delete(handlers::delete_resource::<R>),
        )
}
