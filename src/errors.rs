//! Error types for the SplitHaus crate
//!
//! This module contains all error types that can be returned by SplitHaus operations.

use config::ConfigError;
use mysql_store::{Role, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitHausError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Health check on the {role} connection failed: {source}")]
    HealthCheck {
        role: Role,
        #[source]
        source: sqlx::Error,
    },
}

impl SplitHausError {
    /// `true` when a lookup simply matched no record
    pub fn is_not_found(&self) -> bool {
        matches!(self, SplitHausError::Store(err) if err.is_not_found())
    }
}
