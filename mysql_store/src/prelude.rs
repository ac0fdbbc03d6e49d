//! Convenience re-exports for common mysql-store usage

pub use crate::broker::{ConnectionBroker, PooledConnection};
pub use crate::connector::{Connector, MysqlConnection, MysqlConnector};
pub use crate::errors::StoreError;
pub use crate::registry::PoolRegistry;
pub use crate::role::Role;
pub use crate::table::{FindOptions, FindResult, TableStore};

pub use query_filter::SortOrder;
pub use resource_pool::Resource;
