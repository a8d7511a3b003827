use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service version and whether a match provider is configured.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "vacancy-match",
        "provider": state.matcher.as_ref().map(|m| m.name()),
        "provider_configured": state.matcher.is_some(),
    }))
}
