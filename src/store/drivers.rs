use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::driver::{Driver, DriverStatus};

pub struct DriverStore {
    drivers: DashMap<Uuid, Driver>,
    // serializes every queue_order write: the max scan and the write must be one step
    queue_lock: Mutex<()>,
}

impl DriverStore {
    pub fn new() -> Self {
        Self {
            drivers: DashMap::new(),
            queue_lock: Mutex::new(()),
        }
    }

    pub fn create(
        &self,
        full_name: String,
        chat_channel_id: Option<String>,
    ) -> Result<Driver, AppError> {
        let _guard = self.lock_queue()?;
        let driver = Driver {
            id: Uuid::new_v4(),
            full_name,
            active: true,
            status: DriverStatus::Available,
            queue_order: self.max_queue_order() + 1,
            chat_channel_id,
            updated_at: Utc::now(),
        };
        self.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    pub fn insert(&self, driver: Driver) {
        self.drivers.insert(driver.id, driver);
    }

    pub fn get(&self, id: Uuid) -> Option<Driver> {
        self.drivers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn all_in_order(&self) -> Vec<Driver> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        drivers.sort_by_key(|driver| (driver.queue_order, driver.id));
        drivers
    }

    pub fn available_in_order(&self) -> Vec<Driver> {
        let mut drivers: Vec<Driver> = self
            .drivers
            .iter()
            .filter(|entry| entry.value().is_assignable())
            .map(|entry| entry.value().clone())
            .collect();
        drivers.sort_by_key(|driver| (driver.queue_order, driver.id));
        drivers
    }

    pub fn next_available(&self) -> Option<Driver> {
        self.available_in_order().into_iter().next()
    }

    pub fn set_status(&self, id: Uuid, status: DriverStatus) -> Result<Driver, AppError> {
        self.update(id, |driver| driver.status = status)
    }

    pub fn set_active(&self, id: Uuid, active: bool) -> Result<Driver, AppError> {
        self.update(id, |driver| driver.active = active)
    }

    pub fn rotate_to_back(&self, id: Uuid) -> Result<i64, AppError> {
        let _guard = self.lock_queue()?;
        let next = self.max_queue_order() + 1;
        let mut entry = self
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;
        entry.queue_order = next;
        entry.updated_at = Utc::now();
        Ok(next)
    }

    pub fn renumber_active(&self) -> Result<usize, AppError> {
        let _guard = self.lock_queue()?;
        let mut active: Vec<(i64, Uuid)> = self
            .drivers
            .iter()
            .filter(|entry| entry.value().active)
            .map(|entry| (entry.value().queue_order, entry.value().id))
            .collect();
        active.sort();
        for (position, (_, id)) in active.iter().enumerate() {
            if let Some(mut entry) = self.drivers.get_mut(id) {
                entry.queue_order = position as i64 + 1;
                entry.updated_at = Utc::now();
            }
        }
        Ok(active.len())
    }

    fn update(&self, id: Uuid, apply: impl FnOnce(&mut Driver)) -> Result<Driver, AppError> {
        let mut entry = self
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;
        apply(entry.value_mut());
        entry.updated_at = Utc::now();
        Ok(entry.value().clone())
    }

    fn max_queue_order(&self) -> i64 {
        self.drivers
            .iter()
            .map(|entry| entry.value().queue_order)
            .max()
            .unwrap_or(0)
    }

    fn lock_queue(&self) -> Result<MutexGuard<'_, ()>, AppError> {
        self.queue_lock
            .lock()
            .map_err(|_| AppError::Store("driver queue lock poisoned".to_string()))
    }
}
