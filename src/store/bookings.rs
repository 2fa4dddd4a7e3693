use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};

pub struct BookingStore {
    bookings: DashMap<Uuid, Booking>,
}

impl BookingStore {
    pub fn new() -> Self {
        Self {
            bookings: DashMap::new(),
        }
    }

    pub fn insert(&self, booking: Booking) {
        self.bookings.insert(booking.id, booking);
    }

    pub fn get(&self, id: Uuid) -> Option<Booking> {
        self.bookings.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn list(&self, status: Option<BookingStatus>) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|entry| status.is_none_or(|wanted| entry.value().status == wanted))
            .map(|entry| entry.value().clone())
            .collect();
        bookings.sort_by_key(|booking| std::cmp::Reverse((booking.created_at, booking.id)));
        bookings
    }

    pub fn try_update(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut Booking) -> Result<(), AppError>,
    ) -> Result<Booking, AppError> {
        let mut entry = self
            .bookings
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;
        apply(entry.value_mut())?;
        Ok(entry.value().clone())
    }

    pub fn update_many(
        &self,
        ids: &[Uuid],
        check: impl Fn(&Booking) -> Result<(), AppError>,
        apply: impl Fn(&mut Booking),
    ) -> Result<Vec<Booking>, AppError> {
        for id in ids {
            let entry = self
                .bookings
                .get(id)
                .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;
            check(entry.value())?;
        }

        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            let mut entry = self
                .bookings
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;
            // a row can change between the passes; re-check under the write lock
            check(entry.value())?;
            apply(entry.value_mut());
            updated.push(entry.value().clone());
        }
        Ok(updated)
    }

    pub fn expired_assignments(&self, cutoff: DateTime<Utc>) -> Vec<Booking> {
        let mut expired: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|entry| {
                let booking = entry.value();
                booking.status == BookingStatus::Assigned
                    && booking.driver_accepted_at.is_none()
                    && booking.assigned_at.is_some_and(|at| at < cutoff)
            })
            .map(|entry| entry.value().clone())
            .collect();
        expired.sort_by_key(|booking| (booking.assigned_at, booking.id));
        expired
    }

    pub fn mark_notified(&self, id: Uuid) {
        if let Some(mut entry) = self.bookings.get_mut(&id) {
            entry.notified = true;
        }
    }
}
