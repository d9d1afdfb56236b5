use std::time::{Duration, Instant};

use crate::common::TransactionId;

/// Bookkeeping for a running transaction, created the first time the buffer
/// pool sees its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    id: TransactionId,
    started_at: Instant,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// True once more than `timeout` has passed since the first request.
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.elapsed() > timeout
    }
}
