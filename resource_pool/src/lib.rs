//! Resource pool for long-lived connections
//!
//! This crate provides a bounded async pool: a factory creates resources on
//! demand, borrowers hold a [`Pooled`] guard that hands the resource back on
//! drop, and a semaphore caps how many resources are out at once.

pub mod config;
pub mod errors;
pub mod pool;
pub mod prelude;
pub mod resource;
pub mod stats;

pub use config::PoolConfig;
pub use errors::PoolError;
pub use pool::{Pooled, ResourcePool};
pub use resource::{Resource, ResourceFactory};
pub use stats::PoolStats;
