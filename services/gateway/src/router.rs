use crate::handlers::{health, ws};
use crate::state::AppState;
use axum::http::HeaderValue;
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let configured = state
        .cors_origin
        .as_deref()
        .and_then(|origin| origin.parse::<HeaderValue>().ok());
    let cors = match configured {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health))
        .route("/api/health", get(health::api_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
