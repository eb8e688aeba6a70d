//! Bounded concurrency for sandbox runs.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::InfrastructureError;

#[derive(Debug)]
struct Slots {
    available: Mutex<usize>,
    released: Condvar,
}

impl Slots {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed number of permits shared by all connection threads.
#[derive(Debug, Clone)]
pub struct SlotPool {
    capacity: usize,
    slots: Arc<Slots>,
}

impl SlotPool {
    /// Creates a pool with `capacity` permits (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let permits = capacity.max(1);
        Self {
            capacity: permits,
            slots: Arc::new(Slots {
                available: Mutex::new(permits),
                released: Condvar::new(),
            }),
        }
    }

    /// Total number of permits.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.slots.lock()
    }

    /// Waits up to `timeout` for a permit.
    ///
    /// # Errors
    ///
    /// Returns [`InfrastructureError::CapacityExceeded`] if none became
    /// free in time.
    pub fn acquire(&self, timeout: Duration) -> Result<SlotPermit, InfrastructureError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut available = self.slots.lock();
        while *available == 0 {
            let now = Instant::now();
            if now >= deadline {
                return Err(InfrastructureError::CapacityExceeded {
                    waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                });
            }
            available = self
                .slots
                .released
                .wait_timeout(available, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *available -= 1;
        Ok(SlotPermit {
            slots: Arc::clone(&self.slots),
        })
    }
}

/// A held slot, returned to the pool on drop.
#[derive(Debug)]
#[must_use = "dropping the permit releases the slot immediately"]
pub struct SlotPermit {
    slots: Arc<Slots>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        *self.slots.lock() += 1;
        self.slots.released.notify_one();
    }
}
