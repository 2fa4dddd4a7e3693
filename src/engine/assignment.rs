use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::{AssignmentKind, AssignmentRecord};
use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::Driver;
use crate::notify::ChannelOutcome;
use crate::state::AppState;

use super::{instrumented, note_notifications};

#[derive(Debug)]
pub struct AssignmentOutcome {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub warnings: Vec<String>,
}

pub async fn assign_next(state: &AppState, booking_id: Uuid) -> Result<AssignmentOutcome, AppError> {
    instrumented(state, do_assign_next(state, booking_id)).await
}

async fn do_assign_next(state: &AppState, booking_id: Uuid) -> Result<AssignmentOutcome, AppError> {
    let booking = state
        .bookings
        .get(booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;
    ensure_accepts_assignment(&booking, false)?;

    let candidate = state
        .drivers
        .next_available()
        .ok_or(AppError::NoDriverAvailable)?;
    let driver = claim_driver(state, candidate.id)?;

    let now = Utc::now();
    let updated = state.bookings.try_update(booking_id, |b| {
        ensure_accepts_assignment(b, false)?;
        apply_assignment(b, driver.id, now);
        Ok(())
    })?;

    state.drivers.rotate_to_back(driver.id)?;
    state.record_assignment(AssignmentRecord {
        id: Uuid::new_v4(),
        booking_id,
        driver_id: driver.id,
        driver_name: driver.full_name.clone(),
        kind: AssignmentKind::Auto,
        assigned_at: now,
    });
    info!(
        booking_id = %booking_id,
        driver_id = %driver.id,
        driver = %driver.full_name,
        "booking assigned from queue head"
    );

    let warnings = notify_assignment(state, &driver, &updated).await;
    Ok(AssignmentOutcome {
        driver_id: driver.id,
        driver_name: driver.full_name,
        warnings,
    })
}

pub async fn assign_manual(
    state: &AppState,
    booking_ids: &[Uuid],
    driver_id: Option<Uuid>,
) -> Result<AssignmentOutcome, AppError> {
    instrumented(state, do_assign_manual(state, booking_ids, driver_id)).await
}

async fn do_assign_manual(
    state: &AppState,
    booking_ids: &[Uuid],
    driver_id: Option<Uuid>,
) -> Result<AssignmentOutcome, AppError> {
    let driver_id = driver_id
        .ok_or_else(|| AppError::InvalidArgument("driver_id is required".to_string()))?;
    let driver = state
        .drivers
        .get(driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    if booking_ids.is_empty() {
        let position = state.drivers.rotate_to_back(driver.id)?;
        info!(driver_id = %driver.id, position, "driver rotated to tail without bookings");
        return Ok(AssignmentOutcome {
            driver_id: driver.id,
            driver_name: driver.full_name,
            warnings: Vec::new(),
        });
    }

    let now = Utc::now();
    let updated = state.bookings.update_many(
        booking_ids,
        |b| ensure_accepts_assignment(b, true),
        |b| apply_assignment(b, driver.id, now),
    )?;

    // One rotation per call, not per booking: taking a batch is one turn.
    state.drivers.rotate_to_back(driver.id)?;
    for booking in &updated {
        state.record_assignment(AssignmentRecord {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            driver_id: driver.id,
            driver_name: driver.full_name.clone(),
            kind: AssignmentKind::Manual,
            assigned_at: now,
        });
    }
    info!(
        driver_id = %driver.id,
        driver = %driver.full_name,
        bookings = updated.len(),
        "bookings assigned manually"
    );

    let reports = join_all(
        updated
            .iter()
            .map(|booking| notify_assignment(state, &driver, booking)),
    )
    .await;
    let warnings = reports.into_iter().flatten().collect();

    Ok(AssignmentOutcome {
        driver_id: driver.id,
        driver_name: driver.full_name,
        warnings,
    })
}

fn apply_assignment(booking: &mut Booking, driver_id: Uuid, now: DateTime<Utc>) {
    booking.driver_id = Some(driver_id);
    booking.status = BookingStatus::Assigned;
    booking.assigned_at = Some(now);
    booking.driver_accepted_at = None;
    booking.notified = false;
}

fn ensure_accepts_assignment(booking: &Booking, manual: bool) -> Result<(), AppError> {
    match booking.status {
        BookingStatus::Requested | BookingStatus::Assigned => Ok(()),
        BookingStatus::Accepted if manual => Ok(()),
        status => Err(AppError::Conflict(format!(
            "booking {} is {:?} and cannot be assigned",
            booking.id, status
        ))),
    }
}

pub(crate) fn claim_driver(state: &AppState, id: Uuid) -> Result<Driver, AppError> {
    // the queue head came from a snapshot; the driver may have flipped since
    match state.drivers.get(id) {
        Some(driver) if driver.is_assignable() => Ok(driver),
        _ => Err(AppError::DriverUnavailable(format!(
            "driver {id} went unavailable before the assignment committed"
        ))),
    }
}

pub(crate) async fn notify_assignment(
    state: &AppState,
    driver: &Driver,
    booking: &Booking,
) -> Vec<String> {
    let vehicle = booking
        .vehicle_id
        .and_then(|id| state.vehicles.get(&id).map(|v| v.clone()));

    let report = state
        .notifier
        .notify_driver_assignment(driver, booking, vehicle.as_ref())
        .await;

    if report.chat == ChannelOutcome::Delivered {
        state.bookings.mark_notified(booking.id);
    }
    note_notifications(state, &report);
    report.warnings
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::engine::testkit;
    use crate::models::driver::DriverStatus;
    use crate::notify::testing::{RecordingChat, RecordingMail};

    #[tokio::test]
    async fn assign_next_walks_the_queue_round_robin() {
        let app = testkit::app();
        app.state.drivers.insert(testkit::driver(1, 1));
        app.state.drivers.insert(testkit::driver(2, 2));
        app.state.drivers.insert(testkit::driver(3, 3));
        app.state.bookings.insert(testkit::requested_booking(10));
        app.state.bookings.insert(testkit::requested_booking(11));

        let first = assign_next(&app.state, Uuid::from_u128(10)).await.unwrap();
        let second = assign_next(&app.state, Uuid::from_u128(11)).await.unwrap();

        assert_eq!(first.driver_id, Uuid::from_u128(1));
        assert_eq!(second.driver_id, Uuid::from_u128(2));

        let queue = app.state.drivers.all_in_order();
        let ids: Vec<_> = queue.iter().map(|d| d.id).collect();
        let positions: Vec<_> = queue.iter().map(|d| d.queue_order).collect();
        assert_eq!(
            ids,
            vec![Uuid::from_u128(3), Uuid::from_u128(1), Uuid::from_u128(2)]
        );
        assert_eq!(positions, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn assign_next_commits_the_booking_and_pings_the_driver() {
        let app = testkit::app();
        app.state.drivers.insert(testkit::driver(1, 1));
        app.state.bookings.insert(testkit::requested_booking(10));

        let outcome = assign_next(&app.state, Uuid::from_u128(10)).await.unwrap();
        assert!(outcome.warnings.is_empty());

        let booking = app.state.bookings.get(Uuid::from_u128(10)).unwrap();
        assert_eq!(booking.status, BookingStatus::Assigned);
        assert_eq!(booking.driver_id, Some(Uuid::from_u128(1)));
        assert!(booking.assigned_at.is_some());
        assert!(booking.driver_accepted_at.is_none());
        assert!(booking.notified);

        let sent = app.chat.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "chan-1");
        assert_eq!(app.mail.sent_count(), 1);
    }

    #[tokio::test]
    async fn failed_chat_push_is_a_warning_not_an_error() {
        let app = testkit::app_with(RecordingChat::failing(), RecordingMail::default());
        app.state.drivers.insert(testkit::driver(1, 1));
        app.state.bookings.insert(testkit::requested_booking(10));

        let outcome = assign_next(&app.state, Uuid::from_u128(10)).await.unwrap();
        assert_eq!(outcome.warnings.len(), 1);

        let booking = app.state.bookings.get(Uuid::from_u128(10)).unwrap();
        assert_eq!(booking.status, BookingStatus::Assigned);
        assert!(!booking.notified);
    }

    #[tokio::test]
    async fn empty_queue_is_a_distinct_error() {
        let app = testkit::app();
        app.state.bookings.insert(testkit::requested_booking(10));

        let err = assign_next(&app.state, Uuid::from_u128(10)).await.unwrap_err();
        assert!(matches!(err, AppError::NoDriverAvailable));
    }

    #[tokio::test]
    async fn unknown_booking_is_not_found() {
        let app = testkit::app();
        app.state.drivers.insert(testkit::driver(1, 1));

        let err = assign_next(&app.state, Uuid::from_u128(99)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn assignment_skips_busy_and_inactive_drivers() {
        let app = testkit::app();
        let mut busy = testkit::driver(1, 1);
        busy.status = DriverStatus::Busy;
        let mut inactive = testkit::driver(2, 2);
        inactive.active = false;
        app.state.drivers.insert(busy);
        app.state.drivers.insert(inactive);
        app.state.drivers.insert(testkit::driver(3, 3));
        app.state.bookings.insert(testkit::requested_booking(10));

        let outcome = assign_next(&app.state, Uuid::from_u128(10)).await.unwrap();
        assert_eq!(outcome.driver_id, Uuid::from_u128(3));
    }

    #[tokio::test]
    async fn terminal_booking_rejects_assignment() {
        let app = testkit::app();
        app.state.drivers.insert(testkit::driver(1, 1));
        let mut booking = testkit::requested_booking(10);
        booking.status = BookingStatus::Completed;
        app.state.bookings.insert(booking);

        let err = assign_next(&app.state, Uuid::from_u128(10)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let driver = app.state.drivers.get(Uuid::from_u128(1)).unwrap();
        assert_eq!(driver.queue_order, 1);
    }

    #[tokio::test]
    async fn reassigning_an_assigned_booking_moves_it_to_the_new_head() {
        let app = testkit::app();
        app.state.drivers.insert(testkit::driver(1, 1));
        app.state.drivers.insert(testkit::driver(2, 2));
        app.state.bookings.insert(testkit::requested_booking(10));

        assign_next(&app.state, Uuid::from_u128(10)).await.unwrap();
        let second = assign_next(&app.state, Uuid::from_u128(10)).await.unwrap();

        assert_eq!(second.driver_id, Uuid::from_u128(2));
        let booking = app.state.bookings.get(Uuid::from_u128(10)).unwrap();
        assert_eq!(booking.status, BookingStatus::Assigned);
        assert_eq!(booking.driver_id, Some(Uuid::from_u128(2)));
    }

    #[test]
    fn commit_recheck_rejects_a_newly_busy_driver() {
        let app = testkit::app();
        let mut driver = testkit::driver(1, 1);
        driver.status = DriverStatus::Busy;
        app.state.drivers.insert(driver);

        let err = claim_driver(&app.state, Uuid::from_u128(1)).unwrap_err();
        assert!(matches!(err, AppError::DriverUnavailable(_)));

        let err = claim_driver(&app.state, Uuid::from_u128(99)).unwrap_err();
        assert!(matches!(err, AppError::DriverUnavailable(_)));
    }

    #[tokio::test]
    async fn manual_requires_a_driver_id() {
        let app = testkit::app();
        app.state.bookings.insert(testkit::requested_booking(10));

        let err = assign_manual(&app.state, &[Uuid::from_u128(10)], None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let booking = app.state.bookings.get(Uuid::from_u128(10)).unwrap();
        assert_eq!(booking.status, BookingStatus::Requested);
        assert!(booking.driver_id.is_none());
    }

    #[tokio::test]
    async fn manual_with_unknown_driver_is_not_found() {
        let app = testkit::app();
        app.state.bookings.insert(testkit::requested_booking(10));

        let err = assign_manual(&app.state, &[Uuid::from_u128(10)], Some(Uuid::from_u128(7)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn manual_with_no_bookings_still_rotates_the_driver() {
        let app = testkit::app();
        app.state.drivers.insert(testkit::driver(1, 1));
        app.state.drivers.insert(testkit::driver(2, 2));
        app.state.bookings.insert(testkit::requested_booking(10));

        let outcome = assign_manual(&app.state, &[], Some(Uuid::from_u128(1)))
            .await
            .unwrap();
        assert!(outcome.warnings.is_empty());

        let driver = app.state.drivers.get(Uuid::from_u128(1)).unwrap();
        assert_eq!(driver.queue_order, 3);
        assert_eq!(app.chat.sent_count(), 0);

        let untouched = app.state.bookings.get(Uuid::from_u128(10)).unwrap();
        assert_eq!(untouched.status, BookingStatus::Requested);
        assert!(untouched.driver_id.is_none());
    }

    #[tokio::test]
    async fn manual_assigns_the_batch_and_rotates_once() {
        let app = testkit::app();
        app.state.drivers.insert(testkit::driver(1, 1));
        app.state.drivers.insert(testkit::driver(2, 2));
        app.state.bookings.insert(testkit::requested_booking(10));
        app.state.bookings.insert(testkit::requested_booking(11));

        let outcome = assign_manual(
            &app.state,
            &[Uuid::from_u128(10), Uuid::from_u128(11)],
            Some(Uuid::from_u128(1)),
        )
        .await
        .unwrap();
        assert_eq!(outcome.driver_id, Uuid::from_u128(1));

        for seed in [10u128, 11] {
            let booking = app.state.bookings.get(Uuid::from_u128(seed)).unwrap();
            assert_eq!(booking.status, BookingStatus::Assigned);
            assert_eq!(booking.driver_id, Some(Uuid::from_u128(1)));
        }
        let driver = app.state.drivers.get(Uuid::from_u128(1)).unwrap();
        assert_eq!(driver.queue_order, 3);
        assert_eq!(app.chat.sent_count(), 2);
        assert_eq!(app.state.assignments.len(), 2);
    }

    #[tokio::test]
    async fn manual_batch_fails_whole_on_unknown_booking() {
        let app = testkit::app();
        app.state.drivers.insert(testkit::driver(1, 1));
        app.state.bookings.insert(testkit::requested_booking(10));

        let err = assign_manual(
            &app.state,
            &[Uuid::from_u128(10), Uuid::from_u128(99)],
            Some(Uuid::from_u128(1)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let booking = app.state.bookings.get(Uuid::from_u128(10)).unwrap();
        assert_eq!(booking.status, BookingStatus::Requested);
        let driver = app.state.drivers.get(Uuid::from_u128(1)).unwrap();
        assert_eq!(driver.queue_order, 1);
        assert_eq!(app.chat.sent_count(), 0);
    }

    #[tokio::test]
    async fn manual_takeover_of_accepted_booking_resets_acceptance() {
        let app = testkit::app();
        app.state.drivers.insert(testkit::driver(1, 1));
        app.state.drivers.insert(testkit::driver(2, 2));
        let mut booking = testkit::assigned_booking(10, Uuid::from_u128(1), 5);
        booking.status = BookingStatus::Accepted;
        booking.driver_accepted_at = Some(Utc::now());
        booking.notified = true;
        app.state.bookings.insert(booking);

        assign_manual(&app.state, &[Uuid::from_u128(10)], Some(Uuid::from_u128(2)))
            .await
            .unwrap();

        let booking = app.state.bookings.get(Uuid::from_u128(10)).unwrap();
        assert_eq!(booking.status, BookingStatus::Assigned);
        assert_eq!(booking.driver_id, Some(Uuid::from_u128(2)));
        assert!(booking.driver_accepted_at.is_none());
    }
}
