//! REST routes over the classified output.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{EdgeReviewer, ReviewSummary};
use crate::domain::{Classification, LookupResult, Role};

pub type ReviewState = Arc<RwLock<EdgeReviewer>>;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

// =============================================================================
// Response DTOs
// =============================================================================

#[derive(Debug, Serialize)]
pub struct EdgeResponse {
    pub index: usize,
    pub total: usize,
    pub edge: Value,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub role: Role,
    pub candidates: Vec<LookupResult>,
}

// =============================================================================
// Router
// =============================================================================

pub fn build_router() -> Router<ReviewState> {
    Router::new()
        .route("/api/summary", get(summary))
        .route("/api/edges/{classification}/{index}", get(edge))
        .route("/api/reload", post(reload))
        .route(
            "/api/lookup/{classification}/{index}/{role}",
            get(lookup_candidates),
        )
}

// =============================================================================
// Handlers
// =============================================================================

async fn summary(State(state): State<ReviewState>) -> Json<ReviewSummary> {
    Json(state.read().await.summary())
}

async fn edge(
    State(state): State<ReviewState>,
    Path((classification, index)): Path<(String, usize)>,
) -> ApiResult<EdgeResponse> {
    let classification = parse_classification(&classification)?;
    let reviewer = state.read().await;
    let total = reviewer.count(classification);
    let edge = reviewer
        .edge(classification, index)
        .cloned()
        .ok_or_else(|| out_of_range(classification, index, total))?;
    Ok(Json(EdgeResponse { index, total, edge }))
}

async fn reload(State(state): State<ReviewState>) -> ApiResult<ReviewSummary> {
    let summary = state
        .write()
        .await
        .reload()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    Ok(Json(summary))
}

async fn lookup_candidates(
    State(state): State<ReviewState>,
    Path((classification, index, role)): Path<(String, usize, String)>,
) -> ApiResult<LookupResponse> {
    let classification = parse_classification(&classification)?;
    let role: Role = role
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, e))?;
    let reviewer = state.read().await;
    let candidates = reviewer
        .candidates(classification, index, role)
        .ok_or_else(|| out_of_range(classification, index, reviewer.count(classification)))?;
    Ok(Json(LookupResponse { role, candidates }))
}

fn parse_classification(raw: &str) -> Result<Classification, (StatusCode, String)> {
    raw.parse().map_err(|e: String| (StatusCode::BAD_REQUEST, e))
}

fn out_of_range(
    classification: Classification,
    index: usize,
    total: usize,
) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!("no {classification} edge at index {index} (total {total})"),
    )
}
