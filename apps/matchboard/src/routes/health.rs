use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Liveness plus a cheap snapshot of the in-memory engine state.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "session": {
            "entries": state.session.len(),
            "pendingWrites": state.session.pending_writes(),
        },
        "pipelineEntries": state.stages.entries().len(),
    }))
}
