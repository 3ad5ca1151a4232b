use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, Path, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    config::AppConfig,
    error::{ApiError, AuthFailure},
};

/// Role assumed when a verified token carries no role claim.
pub const DEFAULT_ROLE: &str = "user";
pub const ADMIN_ROLE: &str = "admin";

// --- Identity Provider ---

/// VerifiedIdentity
///
/// What the identity provider vouches for after checking a token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub role: Option<String>,
}

/// IdentityProvider Trait
///
/// The external token verifier. Verification is the only suspension point in
/// the authentication pipeline; a failure is terminal for the request and is
/// never retried.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, String>;
}

/// IdentityState
///
/// The concrete type used to share the identity provider across the application state.
pub type IdentityState = Arc<dyn IdentityProvider>;

/// Claims
///
/// Payload expected inside a bearer JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id.
    pub sub: String,
    /// Optional role claim. Absent means `DEFAULT_ROLE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiration Time (exp). Always validated.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// JwtIdentityProvider
///
/// Verifies HS256-signed tokens against the configured shared secret, with
/// optional issuer and audience checks.
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        // A configured issuer or audience must also be present in the token;
        // jsonwebtoken skips claims that are absent unless they are required.
        let mut required = vec!["exp"];
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }
        if let Some(audience) = audience {
            validation.set_audience(&[audience]);
            required.push("aud");
        }
        validation.set_required_spec_claims(&required);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.jwt_issuer.as_deref(),
            config.jwt_audience.as_deref(),
        )
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, String> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| e.to_string())?;

        Ok(VerifiedIdentity {
            uid: data.claims.sub,
            role: data.claims.role,
        })
    }
}

/// MockIdentityProvider
///
/// Maps fixed token strings to identities. Used by the test suites so that
/// routing and authorization can be exercised without minting tokens.
#[derive(Default, Clone)]
pub struct MockIdentityProvider {
    identities: HashMap<String, VerifiedIdentity>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, uid: &str, role: Option<&str>) -> Self {
        self.identities.insert(
            token.to_string(),
            VerifiedIdentity {
                uid: uid.to_string(),
                role: role.map(str::to_string),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, String> {
        self.identities
            .get(token)
            .cloned()
            .ok_or_else(|| "unknown token".to_string())
    }
}

// --- Authenticator ---

/// AuthUser
///
/// The request-scoped identity context `{ uid, role }`. Created fresh for every
/// request by the authenticator and discarded with the response.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub uid: String,
    pub role: String,
}

/// bearer_token
///
/// Pulls the token out of `Authorization: Bearer <token>`. A missing header, a
/// different scheme and an empty token all count as "no token".
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Authentication(AuthFailure::TokenNotFound))
}

/// AuthUser Extractor Implementation
///
/// If the `authenticate` middleware already ran, the identity is taken from the
/// request extensions. Otherwise the bearer token is verified against the
/// identity provider held in state.
///
/// Rejection: `ApiError::Authentication` (401) with `TOKEN_NOT_FOUND` or
/// `INVALID_TOKEN`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    IdentityState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let provider = IdentityState::from_ref(state);
        let token = bearer_token(&parts.headers)?;

        let verified = provider.verify_token(token).await.map_err(|reason| {
            tracing::warn!(%reason, "bearer token rejected");
            ApiError::Authentication(AuthFailure::InvalidToken)
        })?;

        let role = verified
            .role
            .filter(|role| !role.is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());

        Ok(AuthUser {
            uid: verified.uid,
            role,
        })
    }
}

/// authenticate
///
/// Middleware for routes that require a signed-in caller. Extracting `AuthUser`
/// rejects the request with 401 before the handler runs; on success the
/// identity is stored in the request extensions for the authorizer and the
/// handler downstream.
pub async fn authenticate(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    tracing::debug!(uid = %auth_user.uid, role = %auth_user.role, "request authenticated");
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

// --- Authorizer ---

/// AuthPolicy
///
/// Per-route authorization rule, fixed when the router is built.
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    pub allowed_roles: HashSet<String>,
    /// Also allow the caller when the route's `id` parameter equals their uid.
    pub allow_same_user: bool,
}

impl AuthPolicy {
    pub fn has_role<I, T>(roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            allowed_roles: roles.into_iter().map(Into::into).collect(),
            allow_same_user: false,
        }
    }

    pub fn allow_same_user(mut self) -> Self {
        self.allow_same_user = true;
        self
    }

    /// check
    ///
    /// Pure decision over the identity, this policy and the route's `id`
    /// parameter. Allows on role membership, or on ownership when
    /// `allow_same_user` is set; denies with `ApiError::Authorization` otherwise.
    pub fn check(&self, user: &AuthUser, route_id: Option<&str>) -> Result<(), ApiError> {
        if self.allowed_roles.contains(&user.role) {
            return Ok(());
        }
        if self.allow_same_user && route_id == Some(user.uid.as_str()) {
            return Ok(());
        }
        Err(ApiError::Authorization)
    }
}

/// authorize
///
/// Middleware applying an `AuthPolicy`. It must be layered inside
/// `authenticate`: without an identity in the extensions the request is
/// treated as unauthenticated.
pub async fn authorize(
    State(policy): State<AuthPolicy>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    let user = parts
        .extensions
        .get::<AuthUser>()
        .cloned()
        .ok_or(ApiError::Authentication(AuthFailure::TokenNotFound))?;

    // Routes without path parameters simply have no `id` to compare against.
    let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .map(|Path(params)| params)
        .unwrap_or_default();

    if let Err(denied) = policy.check(&user, params.get("id").map(String::as_str)) {
        tracing::warn!(uid = %user.uid, role = %user.role, "request forbidden by policy");
        return Err(denied);
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}
