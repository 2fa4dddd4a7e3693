use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::{AssignmentKind, AssignmentRecord};
use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::Driver;
use crate::state::AppState;

use super::assignment::notify_assignment;

#[derive(Debug, Serialize)]
pub struct SweepSummary {
    pub examined: usize,
    pub reassigned_count: usize,
}

pub async fn run_sweeper(state: Arc<AppState>, period: Duration) {
    // tokio::time::interval panics on a zero period
    let period = period.max(Duration::from_secs(1));
    info!(
        period_seconds = period.as_secs(),
        "acceptance timeout sweeper started"
    );

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval fires immediately; the first sweep should wait a full period
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match sweep(&state).await {
            Ok(summary) if summary.reassigned_count > 0 => {
                info!(
                    examined = summary.examined,
                    reassigned = summary.reassigned_count,
                    "sweep moved stale assignments"
                );
            }
            Ok(_) => {}
            Err(err) => error!(error = %err, "sweep failed"),
        }
    }
}

pub async fn sweep(state: &AppState) -> Result<SweepSummary, AppError> {
    let cutoff = Utc::now() - state.accept_timeout;
    let expired = state.bookings.expired_assignments(cutoff);
    if expired.is_empty() {
        return Ok(SweepSummary {
            examined: 0,
            reassigned_count: 0,
        });
    }

    let pool = state.drivers.available_in_order();
    if pool.is_empty() {
        info!(
            stale = expired.len(),
            "no available drivers; stale assignments left in place"
        );
        return Ok(SweepSummary {
            examined: expired.len(),
            reassigned_count: 0,
        });
    }

    let examined = expired.len();
    let mut reassigned_count = 0;
    for booking in expired {
        match reassign(state, &booking, &pool).await {
            Ok(driver_id) => {
                reassigned_count += 1;
                state.metrics.reassignments_total.inc();
                info!(
                    booking_id = %booking.id,
                    driver_id = %driver_id,
                    "stale assignment moved to next driver"
                );
            }
            Err(err) => {
                warn!(booking_id = %booking.id, error = %err, "reassignment skipped");
            }
        }
    }

    Ok(SweepSummary {
        examined,
        reassigned_count,
    })
}

async fn reassign(
    state: &AppState,
    booking: &Booking,
    pool: &[Driver],
) -> Result<Uuid, AppError> {
    let next = successor(pool, booking.driver_id);
    let now = Utc::now();

    let updated = state.bookings.try_update(booking.id, |b| {
        // The driver may have accepted between the scan and this write.
        if b.status != BookingStatus::Assigned || b.driver_accepted_at.is_some() {
            return Err(AppError::Conflict(format!(
                "booking {} is no longer awaiting acceptance",
                b.id
            )));
        }
        b.driver_id = Some(next.id);
        b.assigned_at = Some(now);
        b.notified = false;
        Ok(())
    })?;

    state.record_assignment(AssignmentRecord {
        id: Uuid::new_v4(),
        booking_id: booking.id,
        driver_id: next.id,
        driver_name: next.full_name.clone(),
        kind: AssignmentKind::Reassigned,
        assigned_at: now,
    });

    for warning in notify_assignment(state, next, &updated).await {
        warn!(booking_id = %booking.id, warning = %warning, "reassignment notification problem");
    }
    Ok(next.id)
}

fn successor<'a>(pool: &'a [Driver], current: Option<Uuid>) -> &'a Driver {
    let index = current
        .and_then(|id| pool.iter().position(|d| d.id == id))
        .map(|position| (position + 1) % pool.len())
        .unwrap_or(0);
    &pool[index]
}
