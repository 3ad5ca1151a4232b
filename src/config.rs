use std::env;

use crate::crypto::FieldCipher;

// Test-only secrets; never used unless a caller builds AppConfig::default().
const TEST_JWT_SECRET: &str = "local-development-jwt-secret";
const TEST_ENCRYPTION_KEY: &str =
    "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup
/// and immutable afterwards; pulled into handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which settings are mandatory.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory document store (local only).
    pub db_url: Option<String>,
    // Hex-encoded 32-byte AES key for sensitive fields.
    pub encryption_key: String,
    // Shared secret used to verify incoming bearer JWTs.
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    // Address the HTTP server listens on.
    pub bind_addr: String,
}

/// Env
///
/// Defines the runtime context.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking configuration for test setup. Uses the in-memory
    /// store and a fixed, publicly known encryption key and JWT secret.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            encryption_key: TEST_ENCRYPTION_KEY.to_string(),
            jwt_secret: TEST_JWT_SECRET.to_string(),
            jwt_issuer: None,
            jwt_audience: None,
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables and fails fast.
    ///
    /// # Panics
    /// Panics if `ENCRYPTION_KEY` is missing or is not 64 hex characters, if
    /// `JWT_SECRET` is unset, or if `DATABASE_URL` is unset in production.
    /// A bad key must stop the process at startup, never surface per request.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let encryption_key =
            optional_var("ENCRYPTION_KEY").expect("FATAL: ENCRYPTION_KEY must be set.");
        if let Err(e) = FieldCipher::from_hex(&encryption_key) {
            panic!("FATAL: ENCRYPTION_KEY is malformed: {}", e);
        }

        let jwt_secret = optional_var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set.");

        let db_url = match env {
            Env::Production => Some(
                optional_var("DATABASE_URL")
                    .expect("FATAL: DATABASE_URL must be set in production."),
            ),
            Env::Local => optional_var("DATABASE_URL"),
        };

        Self {
            env,
            db_url,
            encryption_key,
            jwt_secret,
            jwt_issuer: optional_var("JWT_ISSUER"),
            jwt_audience: optional_var("JWT_AUDIENCE"),
            bind_addr: optional_var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        }
    }
}
