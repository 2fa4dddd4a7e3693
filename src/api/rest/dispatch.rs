use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::assignment::{assign_manual, assign_next};
use crate::engine::sweeper::{sweep, SweepSummary};
use crate::error::AppError;
use crate::models::assignment::AssignmentRecord;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dispatch/next", post(dispatch_next))
        .route("/dispatch/manual", post(dispatch_manual))
        .route("/dispatch/sweep", post(dispatch_sweep))
        .route("/assignments", get(list_assignments))
}

#[derive(Deserialize)]
pub struct DispatchNextRequest {
    pub booking_id: Uuid,
}

#[derive(Deserialize)]
pub struct ManualAssignRequest {
    #[serde(default)]
    pub booking_ids: Vec<Uuid>,
    pub driver_id: Option<Uuid>,
}

#[derive(Serialize)]
struct DispatchResponse {
    driver_id: Uuid,
    driver_name: String,
    warnings: Vec<String>,
}

async fn dispatch_next(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DispatchNextRequest>,
) -> Result<Json<DispatchResponse>, AppError> {
    let outcome = assign_next(&state, payload.booking_id).await?;

    Ok(Json(DispatchResponse {
        driver_id: outcome.driver_id,
        driver_name: outcome.driver_name,
        warnings: outcome.warnings,
    }))
}

async fn dispatch_manual(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ManualAssignRequest>,
) -> Result<Json<DispatchResponse>, AppError> {
    let outcome = assign_manual(&state, &payload.booking_ids, payload.driver_id).await?;

    Ok(Json(DispatchResponse {
        driver_id: outcome.driver_id,
        driver_name: outcome.driver_name,
        warnings: outcome.warnings,
    }))
}

async fn dispatch_sweep(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepSummary>, AppError> {
    let summary = sweep(&state).await?;
    Ok(Json(summary))
}

async fn list_assignments(State(state): State<Arc<AppState>>) -> Json<Vec<AssignmentRecord>> {
    let mut assignments: Vec<AssignmentRecord> = state
        .assignments
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    assignments.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));

    Json(assignments)
}
