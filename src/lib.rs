//! # SplitHaus
//!
//! A read/write split MySQL access layer: reads go to a replica pool, writes
//! to a primary pool, both built lazily on first use and kept healthy by
//! replacing stale connections at checkout. Conditions are written as flat
//! filter maps such as `{"age:ge": 18, "name:lk": "ann"}`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use splithaus::prelude::*;
//!
//! #[derive(Debug, FromRow)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let splithaus = SplitHaus::new(AppConfig::load()?)?;
//!     let users = splithaus.table("user")?;
//!
//!     let id = users
//!         .insert(json!({ "name": "Ann", "age": 31 }).as_object().unwrap())
//!         .await?;
//!
//!     let filter = json!({ "id": id });
//!     let user: User = users.find_one(filter.as_object().unwrap(), &["id", "name"]).await?;
//!     println!("Created user: {}", user.name);
//!
//!     let adults = json!({ "age:ge": 18 });
//!     let page = users
//!         .find::<User>(
//!             adults.as_object().unwrap(),
//!             &FindOptions::new().order_by("id", SortOrder::Desc).limit(20).with_count(),
//!         )
//!         .await?;
//!     println!("{} of {:?} adults", page.rows.len(), page.total);
//!
//!     splithaus.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::{SplitHaus, SplitHausStats};
pub use errors::SplitHausError;

// Re-export centralized config
pub use config::{AppConfig, GeneralConfig, MysqlConfig};

// Re-export internal crates
pub use mysql_store;
pub use query_filter;
pub use resource_pool;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
