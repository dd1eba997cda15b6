use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use academy_api_rust::handlers;
use academy_api_rust::middleware::{jwt_auth_middleware, validate_identity_middleware};
use academy_api_rust::signing::StaticSigner;
use academy_api_rust::state::AppState;
use academy_api_rust::store::postgres::PostgresStore;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = academy_api_rust::config::config();
    tracing::info!("Starting Academy API in {:?} mode", config.environment);

    let store = PostgresStore::connect()
        .await
        .unwrap_or_else(|e| panic!("failed to connect to database: {}", e));
    // The real signer is the deployment's storage-provider integration; the
    // static signer stands in until one is configured.
    let signer = Arc::new(StaticSigner {
        base: std::env::var("STORAGE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:9000".to_string()),
    });
    let state = AppState::postgres(store.pool().clone(), signer);

    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("ACADEMY_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Academy API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Authenticated API
        .merge(api_routes(state))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/whoami", get(handlers::auth::whoami))
        // Learner side
        .route("/api/:kind/submit", post(handlers::submission::submit))
        .route("/api/:kind/mine", get(handlers::submission::mine))
        .route("/api/courses/:lesson/content", get(handlers::content::course_content))
        // Review side (scope-filtered)
        .route("/api/review/:kind", get(handlers::review::queue))
        .route("/api/review/:kind/bulk", post(handlers::review::decide_bulk))
        .route("/api/review/:kind/:id", post(handlers::review::decide))
        // Coach assignments
        .route(
            "/api/assignments/:user_id",
            put(handlers::assignments::assign).delete(handlers::assignments::unassign),
        )
        // Notifications
        .route("/api/notifications", get(handlers::notifications::list))
        .route("/api/notifications/:id/read", put(handlers::notifications::mark_read))
        // Auth first, then identity validation against the database.
        .route_layer(middleware::from_fn_with_state(state.clone(), validate_identity_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
        .with_state(state)
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Academy API",
            "version": version,
            "description": "Education-platform backend: hierarchical scoping and approval workflows",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/auth/whoami (protected)",
                "submit": "/api/:kind/submit, /api/:kind/mine (protected)",
                "review": "/api/review/:kind[/:id|/bulk] (protected, scope-filtered)",
                "content": "/api/courses/:lesson/content (protected)",
                "assignments": "/api/assignments/:user_id (protected)",
                "notifications": "/api/notifications (protected)",
            }
        }
    }))
}

async fn health() -> axum::response::Json<Value> {
    let now = chrono::Utc::now();
    axum::response::Json(json!({
        "success": true,
        "data": { "status": "ok", "timestamp": now }
    }))
}
