use std::time::Duration;

/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Default buffer pool size (number of cached pages)
pub const DEFAULT_PAGES: usize = 50;

/// How long a transaction may wait for locks, measured from its first page request
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Backoff between two lock acquisition attempts
pub const DEFAULT_LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Tunables for a [`BufferPool`](crate::buffer::BufferPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Maximum number of resident pages
    pub num_pages: usize,
    /// Deadline for lock waits; exceeding it aborts the transaction
    pub lock_timeout: Duration,
    /// Sleep between denied lock requests
    pub lock_retry_interval: Duration,
}

impl BufferPoolConfig {
    /// A pool always holds at least one page; 0 is raised to 1.
    pub fn new(num_pages: usize) -> Self {
        Self {
            num_pages: num_pages.max(1),
            ..Self::default()
        }
    }

    pub fn with_num_pages(mut self, num_pages: usize) -> Self {
        self.num_pages = num_pages.max(1);
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            num_pages: DEFAULT_PAGES,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_retry_interval: DEFAULT_LOCK_RETRY_INTERVAL,
        }
    }
}
