use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum DriverStatus {
    Available,
    Busy,
    Off,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub full_name: String,
    pub active: bool,
    pub status: DriverStatus,
    pub queue_order: i64,
    pub chat_channel_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn is_assignable(&self) -> bool {
        self.active && self.status == DriverStatus::Available
    }
}
