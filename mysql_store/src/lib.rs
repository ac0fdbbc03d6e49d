//! MySQL Store - read/write split connection management and CRUD for SplitHaus
//!
//! Two lazily built connection pools, one per [`Role`]: reads go to the
//! replica and writes to the primary. [`PoolRegistry`] owns the pools,
//! [`ConnectionBroker`] hands out health-checked connections, and
//! [`TableStore`] runs CRUD statements built from filter maps.

pub mod broker;
pub mod connector;
pub mod errors;
pub mod prelude;
pub mod registry;
pub mod role;
pub mod table;

#[cfg(test)]
mod testing;

pub use broker::{ConnectionBroker, PooledConnection};
pub use connector::{is_connection_error, Connector, MysqlConnection, MysqlConnector};
pub use errors::StoreError;
pub use registry::{pool_config, PoolRegistry, RoleFactory, RolePool};
pub use role::Role;
pub use table::{FindOptions, FindResult, MysqlBroker, TableStore};
