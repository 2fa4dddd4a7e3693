use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::acceptance::accept_job;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/webhook/acceptance", post(acceptance))
}

#[derive(Deserialize)]
pub struct AcceptanceEvent {
    pub booking_id: Uuid,
    pub driver_id: Uuid,
}

#[derive(Serialize)]
struct AcceptanceResponse {
    success: bool,
}

// The bot retries on non-2xx, so every non-infrastructure outcome answers success.
async fn acceptance(
    State(state): State<Arc<AppState>>,
    Json(event): Json<AcceptanceEvent>,
) -> Result<Json<AcceptanceResponse>, AppError> {
    accept_job(&state, event.booking_id, event.driver_id).await?;
    Ok(Json(AcceptanceResponse { success: true }))
}
