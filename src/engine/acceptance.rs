use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::BookingStatus;
use crate::state::AppState;

pub async fn accept_job(
    state: &AppState,
    booking_id: Uuid,
    driver_id: Uuid,
) -> Result<(), AppError> {
    let Some(booking) = state.bookings.get(booking_id) else {
        debug!(
            booking_id = %booking_id,
            driver_id = %driver_id,
            "acceptance for unknown booking ignored"
        );
        return Ok(());
    };

    match booking.status {
        BookingStatus::Accepted | BookingStatus::Started | BookingStatus::Completed => {
            ack_driver(
                state,
                driver_id,
                &format!("Booking {booking_id} is already accepted."),
            )
            .await;
            Ok(())
        }
        BookingStatus::Assigned if booking.driver_id == Some(driver_id) => {
            let result = state.bookings.try_update(booking_id, |b| {
                // the sweeper may have moved the job between our read and this write
                if b.status != BookingStatus::Assigned || b.driver_id != Some(driver_id) {
                    return Err(AppError::Conflict(format!(
                        "booking {} changed before the acceptance landed",
                        b.id
                    )));
                }
                b.status = BookingStatus::Accepted;
                b.driver_accepted_at = Some(Utc::now());
                Ok(())
            });
            match result {
                Ok(_) => {
                    info!(booking_id = %booking_id, driver_id = %driver_id, "driver accepted booking");
                    ack_driver(state, driver_id, &format!("Booking {booking_id} accepted.")).await;
                }
                Err(err) => {
                    warn!(
                        booking_id = %booking_id,
                        driver_id = %driver_id,
                        error = %err,
                        "acceptance raced with another update"
                    );
                }
            }
            Ok(())
        }
        BookingStatus::Assigned => {
            warn!(
                booking_id = %booking_id,
                driver_id = %driver_id,
                current_driver = ?booking.driver_id,
                "acceptance from a driver no longer on the booking"
            );
            ack_driver(
                state,
                driver_id,
                &format!("Booking {booking_id} was reassigned to another driver."),
            )
            .await;
            Ok(())
        }
        status => {
            debug!(
                booking_id = %booking_id,
                driver_id = %driver_id,
                status = ?status,
                "acceptance ignored for inactive booking"
            );
            Ok(())
        }
    }
}

async fn ack_driver(state: &AppState, driver_id: Uuid, text: &str) {
    match state.drivers.get(driver_id) {
        Some(driver) => state.notifier.send_driver_message(&driver, text).await,
        None => debug!(driver_id = %driver_id, "no driver record for acceptance ack"),
    }
}
