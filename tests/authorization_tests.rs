use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::{delete, post},
};
use cinema_api::{
    AuthPolicy, AuthUser,
    auth::authorize,
    error::ApiError,
};
use tower::util::ServiceExt;

fn identity(uid: &str, role: &str) -> AuthUser {
    AuthUser {
        uid: uid.to_string(),
        role: role.to_string(),
    }
}

// --- Decision Function ---

#[test]
fn test_admin_role_allowed_by_admin_policy() {
    let policy = AuthPolicy::has_role(["admin"]);
    assert!(policy.check(&identity("u1", "admin"), None).is_ok());
}

#[test]
fn test_admin_role_denied_by_user_only_policy() {
    let policy = AuthPolicy::has_role(["user"]);
    let result = policy.check(&identity("u1", "admin"), None);
    assert!(matches!(result, Err(ApiError::Authorization)));
}

#[test]
fn test_any_listed_role_is_enough() {
    let policy = AuthPolicy::has_role(["admin", "user"]);
    assert!(policy.check(&identity("u1", "user"), None).is_ok());
    assert!(policy.check(&identity("u1", "admin"), None).is_ok());
    assert!(policy.check(&identity("u1", "guest"), None).is_err());
}

#[test]
fn test_same_user_exemption() {
    let policy = AuthPolicy::has_role(["admin"]).allow_same_user();
    let caller = identity("u1", "user");

    assert!(policy.check(&caller, Some("u1")).is_ok());
    assert!(matches!(
        policy.check(&caller, Some("u2")),
        Err(ApiError::Authorization)
    ));
    assert!(policy.check(&caller, None).is_err());
}

#[test]
fn test_same_user_requires_opt_in() {
    let policy = AuthPolicy::has_role(["admin"]);
    assert!(policy.check(&identity("u1", "user"), Some("u1")).is_err());
}

#[test]
fn test_empty_policy_denies_everyone() {
    let policy = AuthPolicy::default();
    assert!(policy.check(&identity("u1", "admin"), Some("u1")).is_err());
}

// --- Middleware ---

// Stand-in for the authenticator: copies a test identity into the extensions.
async fn inject_identity(
    mut request: axum::extract::Request,
    next: middleware::Next,
) -> axum::response::Response {
    let uid = request
        .headers()
        .get("x-test-uid")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let role = request
        .headers()
        .get("x-test-role")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("user")
        .to_string();

    if let Some(uid) = uid {
        request.extensions_mut().insert(AuthUser { uid, role });
    }
    next.run(request).await
}

fn app(policy: AuthPolicy) -> Router {
    Router::new()
        .route("/users/{id}", delete(|| async { "deleted" }))
        .route("/users", post(|| async { "created" }))
        .route_layer(middleware::from_fn_with_state(policy, authorize))
        .route_layer(middleware::from_fn(inject_identity))
}

async fn send(app: Router, method: &str, uri: &str, uid: Option<&str>, role: &str) -> StatusCode {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-test-role", role);
    if let Some(uid) = uid {
        builder = builder.header("x-test-uid", uid);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_middleware_reads_id_from_route_params() {
    let policy = AuthPolicy::has_role(["admin"]).allow_same_user();

    assert_eq!(
        send(app(policy.clone()), "DELETE", "/users/u1", Some("u1"), "user").await,
        StatusCode::OK
    );
    assert_eq!(
        send(app(policy), "DELETE", "/users/u2", Some("u1"), "user").await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_middleware_on_route_without_params() {
    let policy = AuthPolicy::has_role(["admin"]).allow_same_user();

    assert_eq!(
        send(app(policy.clone()), "POST", "/users", Some("u1"), "admin").await,
        StatusCode::OK
    );
    assert_eq!(
        send(app(policy), "POST", "/users", Some("u1"), "user").await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_middleware_without_identity_is_unauthorized() {
    let policy = AuthPolicy::has_role(["admin"]);
    assert_eq!(
        send(app(policy), "DELETE", "/users/u1", None, "admin").await,
        StatusCode::UNAUTHORIZED
    );
}
