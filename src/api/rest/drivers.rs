use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::{Driver, DriverStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id/status", patch(update_driver_status))
        .route("/drivers/:id/active", patch(update_driver_active))
        .route("/queue", get(queue))
        .route("/queue/renumber", post(renumber))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub full_name: String,
    pub chat_channel_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: DriverStatus,
}

#[derive(Deserialize)]
pub struct UpdateActiveRequest {
    pub active: bool,
}

#[derive(Serialize)]
struct RenumberResponse {
    renumbered: usize,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.full_name.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "full_name cannot be empty".to_string(),
        ));
    }

    let driver = state
        .drivers
        .create(payload.full_name, payload.chat_channel_id)?;
    state.refresh_driver_gauge();
    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    Json(state.drivers.all_in_order())
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Driver>, AppError> {
    let driver = state.drivers.set_status(id, payload.status)?;
    state.refresh_driver_gauge();
    Ok(Json(driver))
}

async fn update_driver_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateActiveRequest>,
) -> Result<Json<Driver>, AppError> {
    let driver = state.drivers.set_active(id, payload.active)?;
    state.refresh_driver_gauge();
    Ok(Json(driver))
}

async fn queue(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    Json(state.drivers.available_in_order())
}

async fn renumber(State(state): State<Arc<AppState>>) -> Result<Json<RenumberResponse>, AppError> {
    let renumbered = state.drivers.renumber_active()?;
    Ok(Json(RenumberResponse { renumbered }))
}
