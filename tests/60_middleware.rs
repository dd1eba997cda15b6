mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    middleware,
    routing::get,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use academy_api_rust::auth::{generate_jwt, Claims};
use academy_api_rust::handlers;
use academy_api_rust::middleware::{jwt_auth_middleware, validate_identity_middleware};
use academy_api_rust::state::AppState;
use academy_api_rust::store::memory::MemoryStore;

use common::identity;

// Same layering as the server: jwt first, then the identity row check.
fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/whoami", get(handlers::auth::whoami))
        .route_layer(middleware::from_fn_with_state(state.clone(), validate_identity_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
        .with_state(state)
}

fn token_for(id: Uuid, name: &str, role: &str, leader_id: Option<Uuid>) -> String {
    generate_jwt(Claims::new(id, name.to_string(), role.to_string(), leader_id)).unwrap()
}

async fn whoami(app: Router, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri("/api/auth/whoami");
    if let Some(t) = token {
        builder = builder.header("Authorization", format!("Bearer {}", t));
    }
    let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn missing_bearer_is_unauthorized() {
    let app = app(AppState::in_memory());

    let (status, body) = whoami(app, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let app = app(AppState::in_memory());

    let (status, body) = whoami(app, Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn valid_token_without_an_account_row_is_forbidden() {
    let app = app(AppState::in_memory());
    let ghost = Uuid::new_v4();

    let token = token_for(ghost, "ghost", "leader", None);
    let (status, body) = whoami(app, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn frozen_account_gets_the_frozen_code() {
    let store = Arc::new(MemoryStore::new());
    let mut row = identity("F", "student", None, None);
    row.status = "frozen".to_string();
    store.put_identity(row.clone());
    let app = app(AppState::with_memory_store(store));

    let token = token_for(row.id, &row.name, &row.role, None);
    let (status, body) = whoami(app, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FROZEN");
}

#[tokio::test]
async fn deleted_account_is_forbidden() {
    let store = Arc::new(MemoryStore::new());
    let mut row = identity("D", "student", None, None);
    row.status = "deleted".to_string();
    store.put_identity(row.clone());
    let app = app(AppState::with_memory_store(store));

    let token = token_for(row.id, &row.name, &row.role, None);
    let (status, body) = whoami(app, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn database_row_overrides_stale_claims() {
    let store = Arc::new(MemoryStore::new());
    // Demoted since the token was minted: the row says student.
    let row = identity("S", "student", None, None);
    store.put_identity(row.clone());
    let app = app(AppState::with_memory_store(store));

    let token = token_for(row.id, &row.name, "leader", None);
    let (status, body) = whoami(app, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "student");
    assert_eq!(body["data"]["id"], row.id.to_string());
}
