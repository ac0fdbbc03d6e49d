//! Convenience re-exports for common resource-pool usage

pub use crate::config::PoolConfig;
pub use crate::errors::PoolError;
pub use crate::pool::{Pooled, ResourcePool};
pub use crate::resource::{Resource, ResourceFactory};
pub use crate::stats::PoolStats;

pub use async_trait::async_trait;
