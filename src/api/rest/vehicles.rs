use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::vehicle::Vehicle;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/vehicles", post(create_vehicle).get(list_vehicles))
}

#[derive(Deserialize)]
pub struct CreateVehicleRequest {
    pub name: String,
    pub plate_no: String,
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    if payload.name.trim().is_empty() || payload.plate_no.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "name and plate_no are required".to_string(),
        ));
    }

    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        name: payload.name,
        plate_no: payload.plate_no,
    };

    state.vehicles.insert(vehicle.id, vehicle.clone());
    Ok(Json(vehicle))
}

async fn list_vehicles(State(state): State<Arc<AppState>>) -> Json<Vec<Vehicle>> {
    let mut vehicles: Vec<Vehicle> = state
        .vehicles
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    vehicles.sort_by(|a, b| a.name.cmp(&b.name));

    Json(vehicles)
}
