#![allow(dead_code)]

use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use uuid::Uuid;
use video_uploader::{config::Config, create_app, database::MemoryStore, handlers::AppState};

pub const PRIVATE_KEY: &str = "private_key_test";
pub const PUBLIC_KEY: &str = "public_key_test";

pub fn test_config() -> Config {
    Config {
        database_url: "postgresql://unused".to_string(),
        port: 0,
        jwt_secret: "test-secret".to_string(),
        session_max_age_secs: 3600,
        imagekit_private_key: Some(PRIVATE_KEY.to_string()),
        imagekit_public_key: Some(PUBLIC_KEY.to_string()),
        upload_auth_ttl_secs: 1800,
        cors_allowed_origin: None,
    }
}

pub fn test_state(config: Config) -> AppState {
    let store = Arc::new(MemoryStore::new());
    AppState::new(config, store.clone(), store).expect("Failed to build app state")
}

pub fn test_app() -> (Router, AppState) {
    let state = test_state(test_config());
    (create_app(state.clone()), state)
}

pub fn session_token(state: &AppState) -> String {
    state
        .jwt
        .issue_session(Uuid::new_v4(), "viewer@example.com")
        .expect("Failed to issue session")
        .0
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).expect("Failed to build request")
}

/// Serves the app on an ephemeral local port and returns its base URL.
pub async fn spawn_server() -> (String, AppState) {
    let (app, state) = test_app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    (format!("http://{}", addr), state)
}
