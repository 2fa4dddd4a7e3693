use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/reject", post(reject_booking))
        .route("/bookings/:id/start", post(start_booking))
        .route("/bookings/:id/complete", post(complete_booking))
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub purpose: String,
    pub destination: String,
    pub requested_by: String,
    pub depart_at: DateTime<Utc>,
    pub return_at: Option<DateTime<Utc>>,
    pub vehicle_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<BookingStatus>,
}

#[derive(Deserialize)]
pub struct CompleteBookingRequest {
    pub mileage_km: f64,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    if payload.purpose.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "purpose cannot be empty".to_string(),
        ));
    }
    if payload.destination.trim().is_empty() {
        return Err(AppError::InvalidArgument(
            "destination cannot be empty".to_string(),
        ));
    }
    if let Some(vehicle_id) = payload.vehicle_id {
        if !state.vehicles.contains_key(&vehicle_id) {
            return Err(AppError::NotFound(format!(
                "vehicle {} not found",
                vehicle_id
            )));
        }
    }

    let booking = Booking {
        id: Uuid::new_v4(),
        purpose: payload.purpose,
        destination: payload.destination,
        requested_by: payload.requested_by,
        depart_at: payload.depart_at,
        return_at: payload.return_at,
        vehicle_id: payload.vehicle_id,
        status: BookingStatus::Requested,
        driver_id: None,
        assigned_at: None,
        driver_accepted_at: None,
        notified: false,
        mileage_km: None,
        created_at: Utc::now(),
    };

    state.bookings.insert(booking.clone());
    Ok(Json(booking))
}

async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBookingsQuery>,
) -> Json<Vec<Booking>> {
    Json(state.bookings.list(query.status))
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .bookings
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("booking {} not found", id)))?;

    Ok(Json(booking))
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .bookings
        .try_update(id, |b| close_out(b, BookingStatus::Cancelled))?;
    Ok(Json(booking))
}

async fn reject_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .bookings
        .try_update(id, |b| close_out(b, BookingStatus::Rejected))?;
    Ok(Json(booking))
}

async fn start_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.try_update(id, |b| {
        if b.status != BookingStatus::Accepted {
            return Err(AppError::Conflict(format!(
                "booking {} is {:?}, only accepted trips can start",
                b.id, b.status
            )));
        }
        b.status = BookingStatus::Started;
        Ok(())
    })?;
    Ok(Json(booking))
}

async fn complete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    if payload.mileage_km < 0.0 {
        return Err(AppError::InvalidArgument(
            "mileage_km cannot be negative".to_string(),
        ));
    }

    let booking = state.bookings.try_update(id, |b| {
        if !matches!(b.status, BookingStatus::Accepted | BookingStatus::Started) {
            return Err(AppError::Conflict(format!(
                "booking {} is {:?} and cannot be completed",
                b.id, b.status
            )));
        }
        b.status = BookingStatus::Completed;
        b.mileage_km = Some(payload.mileage_km);
        Ok(())
    })?;
    Ok(Json(booking))
}

fn close_out(booking: &mut Booking, to: BookingStatus) -> Result<(), AppError> {
    if booking.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "booking {} is already {:?}",
            booking.id, booking.status
        )));
    }
    booking.status = to;
    Ok(())
}
