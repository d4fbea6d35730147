//! Axum route handlers for ranking and dashboard statistics.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::MatchRecord;
use crate::ranking::{
    aggregate, FilterState, PageWindow, RankedListPipeline, RankedPage, ScoreNormalizer,
    ScoreWeights, SortSpec, Stats,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    pub records: Vec<MatchRecord>,
    #[serde(default)]
    pub filters: FilterState,
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub page: PageWindow,
    /// Optional sub-score weights for this request.
    #[serde(default)]
    pub weights: Option<ScoreWeights>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    #[serde(flatten)]
    pub page: RankedPage,
    pub stats: Stats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRequest {
    pub records: Vec<MatchRecord>,
    #[serde(default)]
    pub filters: FilterState,
    #[serde(default)]
    pub weights: Option<ScoreWeights>,
}

fn pipeline_for(state: &AppState, weights: Option<ScoreWeights>) -> RankedListPipeline {
    match weights {
        Some(weights) => RankedListPipeline::new(ScoreNormalizer::with_weights(weights)),
        None => state.ranking.clone(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/matches/rank
pub async fn handle_rank(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<Json<RankResponse>, AppError> {
    let pipeline = pipeline_for(&state, req.weights);
    let (page, stats) = pipeline.rank_with_stats(&req.records, &req.filters, &req.sort, &req.page)?;
    Ok(Json(RankResponse { page, stats }))
}

/// POST /api/v1/matches/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    Json(req): Json<StatsRequest>,
) -> Result<Json<Stats>, AppError> {
    let pipeline = pipeline_for(&state, req.weights);
    Ok(Json(aggregate(&pipeline.filtered(&req.records, &req.filters))))
}
