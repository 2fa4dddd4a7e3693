use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum AssignmentKind {
    Auto,
    Manual,
    Reassigned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub kind: AssignmentKind,
    pub assigned_at: DateTime<Utc>,
}
