//! Slot pool shared by the control loop and relay tasks.
//!
//! A slot id is owned by exactly one party at a time: the pool buffer, the
//! control loop while it registers the slot, or the relay task forwarding a
//! request on it. Claiming removes the id from the buffer and releasing puts
//! it back; nothing else touches it.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

/// Numbered registration unit, `0..pool_size`.
pub type SlotId = usize;

/// Bounded set of slot ids available for registration.
#[derive(Debug, Clone)]
pub struct SlotPool {
    available: Arc<Mutex<VecDeque<SlotId>>>,

    /// Woken on every release
    released: Arc<Notify>,

    capacity: usize,
}

impl SlotPool {
    /// Create a pool holding every id in `0..capacity`
    pub fn new(capacity: usize) -> Self {
        Self {
            available: Arc::new(Mutex::new((0..capacity).collect())),
            released: Arc::new(Notify::new()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take an id out of the pool, waiting until one is released if the pool
    /// is empty.
    pub async fn claim(&self) -> SlotId {
        loop {
            // Registered before checking so a release in between is not missed
            let released = self.released.notified();

            if let Some(id) = self.available.lock().await.pop_front() {
                return id;
            }

            released.await;
        }
    }

    /// Return an id to the pool.
    ///
    /// Ids that are out of range or already available are refused, so the
    /// pool can never hand the same id out twice. Returns whether the id was
    /// accepted.
    pub async fn release(&self, id: SlotId) -> bool {
        if id >= self.capacity {
            tracing::warn!(slot = id, capacity = self.capacity, "Refusing out of range slot");
            return false;
        }

        let mut available = self.available.lock().await;
        if available.contains(&id) {
            tracing::warn!(slot = id, "Refusing release of slot that is already available");
            return false;
        }

        available.push_back(id);
        drop(available);
        self.released.notify_one();

        tracing::trace!(slot = id, "Slot released");
        true
    }

    /// Ids currently sitting in the pool, in claim order.
    pub async fn available_slots(&self) -> Vec<SlotId> {
        self.available.lock().await.iter().copied().collect()
    }

    pub async fn available_count(&self) -> usize {
        self.available.lock().await.len()
    }
}
