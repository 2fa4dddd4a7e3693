use chrono::Duration;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::assignment::AssignmentRecord;
use crate::models::vehicle::Vehicle;
use crate::notify::Notifier;
use crate::observability::metrics::Metrics;
use crate::store::bookings::BookingStore;
use crate::store::drivers::DriverStore;

pub struct AppState {
    pub drivers: DriverStore,
    pub bookings: BookingStore,
    pub vehicles: DashMap<Uuid, Vehicle>,
    pub assignments: DashMap<Uuid, AssignmentRecord>,
    pub assignment_events_tx: broadcast::Sender<AssignmentRecord>,
    pub notifier: Notifier,
    pub accept_timeout: Duration,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(notifier: Notifier, accept_timeout_minutes: i64, event_buffer_size: usize) -> Self {
        let (assignment_events_tx, _) = broadcast::channel(event_buffer_size);

        Self {
            drivers: DriverStore::new(),
            bookings: BookingStore::new(),
            vehicles: DashMap::new(),
            assignments: DashMap::new(),
            assignment_events_tx,
            notifier,
            accept_timeout: Duration::minutes(accept_timeout_minutes),
            metrics: Metrics::new(),
        }
    }

    pub fn record_assignment(&self, record: AssignmentRecord) {
        self.assignments.insert(record.id, record.clone());
        let _ = self.assignment_events_tx.send(record);
    }

    pub fn refresh_driver_gauge(&self) {
        self.metrics
            .drivers_available
            .set(self.drivers.available_in_order().len() as i64);
    }
}
