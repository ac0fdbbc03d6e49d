//! Error types for pool operations

use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`crate::ResourcePool`]
///
/// `E` is the error type of the pool's resource factory.
#[derive(Error, Debug)]
pub enum PoolError<E> {
    #[error("Resource factory error: {0}")]
    Factory(#[source] E),

    #[error("Pool is closed")]
    Closed,

    #[error("Timed out after {}ms waiting for a free pool slot", .0.as_millis())]
    Timeout(Duration),
}

impl<E> PoolError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::Timeout(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PoolError::Closed)
    }
}
