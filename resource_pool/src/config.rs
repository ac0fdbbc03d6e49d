//! Pool sizing and timeout configuration

use std::time::Duration;

/// Pool configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Resources created eagerly when the pool is built
    pub min_size: usize,
    /// Upper bound on resources out on loan plus idle
    pub max_size: usize,
    /// Idle resources older than this are closed instead of reused
    pub idle_timeout: Option<Duration>,
    /// Default wait for a free slot; `None` waits until one frees up
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: 0,
            max_size: 10,
            idle_timeout: Some(Duration::from_secs(600)),
            acquire_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl PoolConfig {
    pub fn new(min_size: usize, max_size: usize) -> Self {
        Self {
            min_size,
            max_size,
            ..Default::default()
        }
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Number of resources created during warm-up
    pub fn warm_size(&self) -> usize {
        self.min_size.min(self.max_size)
    }
}
