//! Axum route handlers for per-view session state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::errors::{AppError, EngineError};
use crate::session::Staleness;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReadResponse {
    pub key: String,
    pub payload: Value,
    pub age_millis: u64,
    pub written_at: DateTime<Utc>,
    pub staleness: Staleness,
}

/// GET /api/v1/session/:key
pub async fn handle_read(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SessionReadResponse>, AppError> {
    let cached = state
        .session
        .read(&key)?
        .ok_or_else(|| EngineError::NotFound(format!("session key {key}")))?;
    Ok(Json(SessionReadResponse {
        staleness: cached.staleness(&state.staleness),
        age_millis: cached.age_millis,
        written_at: cached.written_at,
        payload: cached.payload,
        key,
    }))
}

/// PUT /api/v1/session/:key
/// Accepted, not persisted: the durable write is debounced.
pub async fn handle_write(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(payload): Json<Value>,
) -> StatusCode {
    state.session.write(key, payload);
    StatusCode::ACCEPTED
}

/// DELETE /api/v1/session/:key
pub async fn handle_purge(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    state.session.purge(&key)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/session
/// Logout: completes before responding, with no pending writes left behind.
pub async fn handle_purge_all(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.session.purge_all()?;
    Ok(StatusCode::NO_CONTENT)
}
