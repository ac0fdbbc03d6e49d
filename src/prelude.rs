//! Convenience re-exports for common SplitHaus usage
//!
//! # Example
//!
//! ```rust
//! use splithaus::prelude::*;
//!
//! let filter = json!({ "status": "active" });
//! assert_eq!(compile(filter.as_object().unwrap()).len(), 1);
//! ```

// Core SplitHaus components
pub use crate::core::{SplitHaus, SplitHausStats};
pub use crate::errors::SplitHausError;

// Re-export centralized config
pub use config::{AppConfig, ConfigError};

// Connection management and CRUD
pub use mysql_store::prelude::*;

// Filter language
pub use query_filter::prelude::*;

// Pool types
pub use resource_pool::{PoolConfig, PoolError, PoolStats};

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;

// Commonly used sqlx types
pub use sqlx::{FromRow, MySql, MySqlConnection, Row};
