use crate::Result;
use ohno::IntoAppError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Permission to issue store operations; returned to the pool on drop.
pub type Ticket = OwnedSemaphorePermit;

/// Bounds the number of manifest workers talking to the store at once.
///
/// Wrap in an `Arc` via [`TicketPool::new`], then call [`TicketPool::acquire`] before
/// the first store operation of a unit of work. At most `capacity` tickets are out at
/// any time. Dropping a [`Ticket`] returns it, whether the work succeeded, failed or
/// panicked.
#[derive(Debug)]
pub struct TicketPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl TicketPool {
    /// Create a pool holding `capacity` tickets.
    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Wait for a free ticket.
    pub async fn acquire(&self) -> Result<Ticket> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .into_app_err("acquiring a write ticket")
    }

    /// Number of tickets not currently held
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
