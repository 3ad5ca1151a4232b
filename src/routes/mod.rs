//! Router Module Index
//!
//! Organizes each resource's routes into access tiers. Access control is
//! applied per tier with route layers, so a handler can never be reached
//! without the checks its tier demands.

use axum::{Router, middleware};

use crate::{
    AppState,
    auth::{ADMIN_ROLE, AuthPolicy, authenticate, authorize},
    service::Resource,
};

/// Routes accessible to all callers (read-only).
pub mod public;

/// Routes that require a verified bearer token.
pub mod authenticated;

/// Routes that require a verified bearer token and the `admin` role.
pub mod admin;

/// resource_routes
///
/// Assembles the full router for one resource, to be nested under
/// `/api/v1/<collection>`.
///
/// Route layers wrap from the inside out, so on the admin tier `authenticate`
/// (added last) runs before `authorize`.
pub fn resource_routes<R: Resource>(state: AppState) -> Router<AppState> {
    let authenticated = authenticated::authenticated_routes::<R>().route_layer(
        middleware::from_fn_with_state(state.clone(), authenticate),
    );

    let admin = admin::admin_routes::<R>()
        .route_layer(middleware::from_fn_with_state(
            AuthPolicy::has_role([ADMIN_ROLE]),
            authorize,
        ))
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    public::public_routes::<R>()
        .merge(authenticated)
        .merge(admin)
}
