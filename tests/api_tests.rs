use cinema_api::{
    AppConfig, AppState, FieldCipher, InMemoryDocumentStore,
    auth::{Claims, JwtIdentityProvider},
    create_router,
    repository::DocumentStoreState,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;

const TEST_SECRET: &str = "api-test-secret";

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

/// Serves the real router, with JWT verification, on a random local port.
async fn spawn_app() -> TestApp {
    let config = AppConfig {
        jwt_secret: TEST_SECRET.to_string(),
        ..AppConfig::default()
    };
    let store = Arc::new(InMemoryDocumentStore::new()) as DocumentStoreState;
    let cipher = FieldCipher::from_hex(&config.encryption_key).unwrap();
    let identity = Arc::new(JwtIdentityProvider::from_config(&config));

    let router = create_router(AppState::new(store, cipher, identity));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

fn token(uid: &str, role: Option<&str>) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub: uid.to_string(),
        role: role.map(str::to_string),
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/v1/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn test_promotion_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = token("u1", None);
    let admin = token("a1", Some("admin"));
    let base = format!("{}/api/v1/promotions", app.address);

    // Create
    let response = client
        .post(&base)
        .bearer_auth(&user)
        .json(&json!({
            "title": "Summer",
            "description": "Two for one",
            "discount": "50%",
            "startDate": "2024-06-01",
            "endDate": "2024-08-31",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["description"], "Two for one");

    // A regular user cannot update
    let response = client
        .put(format!("{}/{}", base, id))
        .bearer_auth(&user)
        .json(&json!({"discount": "60%"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // Admin update
    let response = client
        .put(format!("{}/{}", base, id))
        .bearer_auth(&admin)
        .json(&json!({"discount": "60%"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["discount"], "60%");
    assert_eq!(body["data"]["title"], "Summer");

    // Public read
    let body: Value = client
        .get(format!("{}/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["description"], "Two for one");

    // Admin delete, then gone
    let response = client
        .delete(format!("{}/{}", base, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client.get(format!("{}/{}", base, id)).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let forged = encode(
        &Header::default(),
        &Claims {
            sub: "a1".to_string(),
            role: Some("admin".to_string()),
            exp: now + 3600,
            iat: now,
        },
        &EncodingKey::from_secret(b"someone-elses-secret"),
    )
    .unwrap();

    let response = client
        .delete(format!("{}/api/v1/movies/any", app.address))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_TOKEN");
}
