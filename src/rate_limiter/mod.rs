use log::debug;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Caps the number of requests in flight at once.
pub struct RequestLimiter {
    permits: Semaphore,
    capacity: usize,
}

impl RequestLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            permits: Semaphore::new(capacity),
            capacity,
        }
    }

    /// Wait for a free slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        if self.permits.available_permits() == 0 {
            debug!("All {} request slots busy, waiting", self.capacity);
        }
        self.permits.acquire().await.ok()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }
}
