use crate::role::Role;
use query_filter::{FilterError, ValidationError};
use resource_pool::PoolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No {role} pool available: {source}")]
    PoolUnavailable {
        role: Role,
        #[source]
        source: PoolError<sqlx::Error>,
    },

    #[error("Could not check out a {role} connection: {source}")]
    Checkout {
        role: Role,
        #[source]
        source: PoolError<sqlx::Error>,
    },

    #[error("Stale {role} connection could not be replaced: {source}")]
    Reconnect {
        role: Role,
        #[source]
        source: sqlx::Error,
    },

    #[error("Table name cannot be empty")]
    EmptyTableName,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("No matching record in '{table}'")]
    NotFound { table: String },

    #[error("Database operation '{operation}' on '{table}' failed: {source}")]
    Query {
        table: String,
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    pub(crate) fn query(table: &str, operation: &'static str, source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                table: table.to_string(),
            },
            source => StoreError::Query {
                table: table.to_string(),
                operation,
                source,
            },
        }
    }

    /// `true` for the "no matching record" outcome, which is not a fault
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// `true` when the server could not be reached or a connection broke
    pub fn is_connectivity(&self) -> bool {
        match self {
            StoreError::PoolUnavailable { .. } | StoreError::Reconnect { .. } => true,
            StoreError::Checkout { source, .. } => matches!(source, PoolError::Factory(_)),
            StoreError::Query { source, .. } => crate::connector::is_connection_error(source),
            _ => false,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            StoreError::PoolUnavailable { role, .. }
            | StoreError::Checkout { role, .. }
            | StoreError::Reconnect { role, .. } => Some(*role),
            _ => None,
        }
    }
}
