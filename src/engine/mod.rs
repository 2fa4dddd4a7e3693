pub mod acceptance;
pub mod assignment;
pub mod sweeper;

use std::future::Future;
use std::time::Instant;

use crate::error::AppError;
use crate::notify::{ChannelOutcome, NotifyReport};
use crate::state::AppState;

pub(crate) async fn instrumented<T>(
    state: &AppState,
    op: impl Future<Output = Result<T, AppError>>,
) -> Result<T, AppError> {
    let started = Instant::now();
    let result = op.await;
    let outcome = if result.is_ok() { "success" } else { "error" };

    state
        .metrics
        .assignment_latency_seconds
        .with_label_values(&[outcome])
        .observe(started.elapsed().as_secs_f64());
    state
        .metrics
        .assignments_total
        .with_label_values(&[outcome])
        .inc();

    result
}

pub(crate) fn note_notifications(state: &AppState, report: &NotifyReport) {
    for (channel, outcome) in [("chat", report.chat), ("mail", report.mail)] {
        let label = match outcome {
            ChannelOutcome::Delivered => "delivered",
            ChannelOutcome::Failed => "failed",
            ChannelOutcome::Skipped => continue,
        };
        state
            .metrics
            .notifications_total
            .with_label_values(&[channel, label])
            .inc();
    }
}

#[cfg(test)]
pub(crate) mod testkit {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::models::booking::{Booking, BookingStatus};
    use crate::models::driver::{Driver, DriverStatus};
    use crate::notify::testing::{RecordingChat, RecordingMail};
    use crate::notify::Notifier;
    use crate::state::AppState;

    pub struct TestApp {
        pub state: AppState,
        pub chat: Arc<RecordingChat>,
        pub mail: Arc<RecordingMail>,
    }

    pub fn app() -> TestApp {
        app_with(RecordingChat::default(), RecordingMail::default())
    }

    pub fn app_with(chat: RecordingChat, mail: RecordingMail) -> TestApp {
        let chat = Arc::new(chat);
        let mail = Arc::new(mail);
        let notifier = Notifier::new(
            chat.clone(),
            mail.clone(),
            "fleet-admin@example.gov".to_string(),
        );
        TestApp {
            state: AppState::new(notifier, 60, 64),
            chat,
            mail,
        }
    }

    pub fn driver(seed: u128, queue_order: i64) -> Driver {
        Driver {
            id: Uuid::from_u128(seed),
            full_name: format!("Driver {seed}"),
            active: true,
            status: DriverStatus::Available,
            queue_order,
            chat_channel_id: Some(format!("chan-{seed}")),
            updated_at: Utc::now(),
        }
    }

    pub fn requested_booking(seed: u128) -> Booking {
        Booking {
            id: Uuid::from_u128(seed),
            purpose: "site inspection".to_string(),
            destination: "north depot".to_string(),
            requested_by: "operations".to_string(),
            depart_at: Utc::now() + Duration::hours(2),
            return_at: None,
            vehicle_id: None,
            status: BookingStatus::Requested,
            driver_id: None,
            assigned_at: None,
            driver_accepted_at: None,
            notified: false,
            mileage_km: None,
            created_at: Utc::now(),
        }
    }

    pub fn assigned_booking(seed: u128, driver_id: Uuid, assigned_minutes_ago: i64) -> Booking {
        let mut booking = requested_booking(seed);
        booking.status = BookingStatus::Assigned;
        booking.driver_id = Some(driver_id);
        booking.assigned_at = Some(Utc::now() - Duration::minutes(assigned_minutes_ago));
        booking
    }
}
