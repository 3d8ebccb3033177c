use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn api_health(State(state): State<AppState>) -> Json<Value> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    Json(json!({
        "ok": true,
        "ts": ts,
        "uptime": state.started_at.elapsed().as_secs(),
    }))
}
