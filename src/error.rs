use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{crypto::CipherError, repository::StoreError};

/// AuthFailure
///
/// The two ways a bearer token can fail to establish an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization: Bearer <token>` header, or the token is empty.
    TokenNotFound,
    /// The identity provider rejected the token (expired, malformed, bad signature).
    InvalidToken,
}

impl AuthFailure {
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::TokenNotFound => "TOKEN_NOT_FOUND",
            AuthFailure::InvalidToken => "INVALID_TOKEN",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthFailure::TokenNotFound => "Unauthorized: No token provided",
            AuthFailure::InvalidToken => "Unauthorized: Invalid token",
        }
    }
}

/// ApiError
///
/// The single error type that services, middleware and handlers return.
/// Every failure in a request ends up here, and `IntoResponse` below is the only
/// place that decides which HTTP status and body the caller sees.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{}", .0.message())]
    Authentication(AuthFailure),

    #[error("Forbidden: Insufficient role")]
    Authorization,

    #[error("{0}")]
    NotFound(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorBody
///
/// JSON body written for every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Decryption(_) | ApiError::Encryption(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Authentication(failure) => failure.code(),
            ApiError::Authorization => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Decryption(_) => "DECRYPTION_ERROR",
            ApiError::Encryption(_) => "ENCRYPTION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side failures are logged in full but answered generically, so
        // neither key material nor stored ciphertext reaches the caller.
        let message = if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
            self.to_string()
        };

        let body = ErrorBody {
            message,
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<CipherError> for ApiError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::Encryption(msg) => ApiError::Encryption(msg),
            CipherError::Decryption(msg) => ApiError::Decryption(msg),
            CipherError::InvalidKey(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

// A body that is not JSON, or JSON of the wrong shape, is bad input.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
