//! Core SplitHaus functionality
//!
//! This module contains the main SplitHaus struct, which wires the
//! configuration, the per-role pool registry and the checkout broker
//! together and hands out table stores.

use std::sync::Arc;

use config::AppConfig;
use mysql_store::{ConnectionBroker, MysqlBroker, MysqlConnector, PoolRegistry, Role, TableStore};
use resource_pool::PoolStats;

use crate::errors::SplitHausError;

/// Snapshot of both pools
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitHausStats {
    /// `None` until the read pool has been built
    pub read: Option<PoolStats>,
    pub write: Option<PoolStats>,
    /// Stale connections replaced at checkout
    pub stale_replaced: u64,
}

/// Main SplitHaus coordinator
pub struct SplitHaus {
    config: AppConfig,
    broker: Arc<MysqlBroker>,
}

impl SplitHaus {
    /// Build the coordinator; no connection is opened until first use
    pub fn new(config: AppConfig) -> Result<Self, SplitHausError> {
        config.validate()?;

        let connector = MysqlConnector::new(&config);
        let registry = Arc::new(PoolRegistry::from_config(connector, &config.mysql));
        // anything idle past half the idle timeout gets pinged before reuse
        let broker = Arc::new(
            ConnectionBroker::new(registry).with_liveness_check(config.mysql.idle_timeout() / 2),
        );

        crate::debug_log!(
            read = %config.mysql.display_address(&config.mysql.read_endpoint()),
            write = %config.mysql.display_address(&config.mysql.write_endpoint()),
            "splithaus configured"
        );

        Ok(Self { config, broker })
    }

    /// Build from `.env`, `SPLITHAUS_CONFIG`, `./splithaus.toml` or the defaults
    pub fn load() -> Result<Self, SplitHausError> {
        Self::new(AppConfig::load()?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn broker(&self) -> &Arc<MysqlBroker> {
        &self.broker
    }

    pub fn registry(&self) -> &Arc<PoolRegistry<MysqlConnector>> {
        self.broker.registry()
    }

    /// Store for `name` with the configured table prefix applied
    pub fn table(&self, name: &str) -> Result<TableStore, SplitHausError> {
        let store = TableStore::new(Arc::clone(&self.broker), &self.config.mysql.prefix, name)?;
        crate::trace_log!(table = %store.table(), "table store created");
        Ok(store)
    }

    /// Check out one connection per role and ping the server behind it
    pub async fn health_check(&self) -> Result<(), SplitHausError> {
        for role in Role::ALL {
            let mut conn = self.broker.checkout(role).await?;
            conn.ping()
                .await
                .map_err(|source| SplitHausError::HealthCheck { role, source })?;
        }
        Ok(())
    }

    pub async fn stats(&self) -> SplitHausStats {
        SplitHausStats {
            read: self.registry().stats(Role::Read).await,
            write: self.registry().stats(Role::Write).await,
            stale_replaced: self.broker.stale_replaced(),
        }
    }

    /// Close both pools; later calls rebuild them on demand
    pub async fn shutdown(&self) {
        self.registry().close_all().await;
        tracing::info!("splithaus pools closed");
    }
}
