use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum BookingStatus {
    Requested,
    Assigned,
    Accepted,
    Started,
    Completed,
    Cancelled,
    Rejected,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Rejected
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub purpose: String,
    pub destination: String,
    pub requested_by: String,
    pub depart_at: DateTime<Utc>,
    pub return_at: Option<DateTime<Utc>>,
    pub vehicle_id: Option<Uuid>,
    pub status: BookingStatus,
    pub driver_id: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub driver_accepted_at: Option<DateTime<Utc>>,
    pub notified: bool,
    pub mileage_km: Option<f64>,
    pub created_at: DateTime<Utc>,
}
