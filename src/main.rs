use cinema_api::{
    AppState,
    auth::JwtIdentityProvider,
    config::{AppConfig, Env},
    create_router,
    crypto::FieldCipher,
    repository::{DocumentStoreState, InMemoryDocumentStore, PostgresDocumentStore},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the field cipher, the document store,
/// the identity provider and the HTTP server, in that order. Any
/// misconfiguration stops the process here rather than on the first request.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG takes precedence over the development defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cinema_api=debug,tower_http=info,axum=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Field Cipher
    // AppConfig::load already validated the key; this cannot fail past that point.
    let cipher = FieldCipher::from_hex(&config.encryption_key)
        .expect("FATAL: ENCRYPTION_KEY could not be turned into a cipher key.");

    // 5. Document Store
    let store: DocumentStoreState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            let store = PostgresDocumentStore::new(pool);
            store
                .ensure_schema()
                .await
                .expect("FATAL: Failed to create the documents table.");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; records are kept in memory and lost on exit");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    // 6. Identity Provider
    let identity = Arc::new(JwtIdentityProvider::from_config(&config));

    // 7. Unified State Assembly
    let app_state = AppState::new(store, cipher, identity);

    // 8. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("HTTP server terminated unexpectedly");
}
