//! Axum route handlers for the recruiter pipeline (kanban) board.

use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, ErrorBody};
use crate::funnel::Transition;
use crate::models::{PipelineEntry, Stage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StageQuery {
    pub stage: Option<Stage>,
}

#[derive(Debug, Serialize)]
pub struct PipelineListResponse {
    pub entries: Vec<PipelineEntry>,
    pub counts: BTreeMap<Stage, usize>,
}

#[derive(Debug, Deserialize)]
pub struct StageChangeRequest {
    pub stage: Stage,
}

#[derive(Debug, Deserialize)]
pub struct BulkStageRequest {
    pub ids: Vec<String>,
    pub stage: Stage,
}

#[derive(Debug, Serialize)]
pub struct BulkStageResponse {
    pub succeeded: BTreeSet<String>,
    pub failed: BTreeMap<String, ErrorBody>,
    pub superseded: BTreeSet<String>,
}

/// GET /api/v1/pipeline
pub async fn handle_list(
    State(state): State<AppState>,
    Query(query): Query<StageQuery>,
) -> Json<PipelineListResponse> {
    let entries = match query.stage {
        Some(stage) => state.stages.entries_in_stage(stage),
        None => state.stages.entries(),
    };
    Json(PipelineListResponse {
        entries,
        counts: state.stages.stage_counts(),
    })
}

/// POST /api/v1/pipeline/entries
pub async fn handle_track(
    State(state): State<AppState>,
    Json(entry): Json<PipelineEntry>,
) -> Result<(StatusCode, Json<PipelineEntry>), AppError> {
    if entry.id.trim().is_empty() {
        return Err(AppError::Validation("entry id must not be empty".to_string()));
    }
    state.stages.track(entry.clone());
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PATCH /api/v1/pipeline/entries/:id/stage
pub async fn handle_move(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StageChangeRequest>,
) -> Result<Json<Transition>, AppError> {
    let transition = state.stages.move_one(&id, req.stage).await?;
    Ok(Json(transition))
}

/// POST /api/v1/pipeline/bulk-stage
pub async fn handle_bulk_move(
    State(state): State<AppState>,
    Json(req): Json<BulkStageRequest>,
) -> Result<Json<BulkStageResponse>, AppError> {
    if req.ids.is_empty() {
        return Err(AppError::Validation("ids must not be empty".to_string()));
    }
    let result = state.stages.move_bulk(req.ids, req.stage).await;
    Ok(Json(BulkStageResponse {
        succeeded: result.succeeded,
        failed: result
            .failed
            .iter()
            .map(|(id, e)| (id.clone(), ErrorBody::from(e)))
            .collect(),
        superseded: result.superseded,
    }))
}

/// DELETE /api/v1/pipeline/entries/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.stages.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
