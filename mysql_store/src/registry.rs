//! Pool manager
//!
//! Owns at most one connection pool per role. Pools are built lazily on
//! first demand with double-checked construction: readers take the fast
//! path through a read lock, and only callers that find no open pool queue
//! up on the role's construction lock, where the check is repeated before
//! anything is built. A closed pool counts as absent and is rebuilt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use config::MysqlConfig;
use resource_pool::{PoolConfig, PoolError, PoolStats, ResourceFactory, ResourcePool};
use tokio::sync::{Mutex, RwLock};

use crate::connector::Connector;
use crate::role::Role;

/// Pool factory that opens connections for one role
pub struct RoleFactory<C: Connector> {
    connector: Arc<C>,
    role: Role,
}

impl<C: Connector> RoleFactory<C> {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn connector(&self) -> &Arc<C> {
        &self.connector
    }
}

#[async_trait]
impl<C: Connector> ResourceFactory for RoleFactory<C> {
    type Resource = C::Connection;
    type Error = sqlx::Error;

    async fn create(&self) -> Result<C::Connection, sqlx::Error> {
        self.connector.connect(self.role).await
    }
}

/// The pool serving one role
pub type RolePool<C> = ResourcePool<RoleFactory<C>>;

struct RoleSlot<C: Connector> {
    current: RwLock<Option<Arc<RolePool<C>>>>,
    init: Mutex<()>,
    generation: AtomicU64,
}

impl<C: Connector> RoleSlot<C> {
    fn new() -> Self {
        Self {
            current: RwLock::new(None),
            init: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    async fn open_pool(&self) -> Option<Arc<RolePool<C>>> {
        match &*self.current.read().await {
            Some(pool) if !pool.is_closed() => Some(Arc::clone(pool)),
            _ => None,
        }
    }
}

/// Pool sizing and timeouts taken from the `[mysql]` section
pub fn pool_config(mysql: &MysqlConfig) -> PoolConfig {
    PoolConfig::new(mysql.pool_min_active, mysql.pool_max_active)
        .with_idle_timeout(Some(mysql.idle_timeout()))
        .with_acquire_timeout(mysql.wait_timeout())
}

/// Per-role pool registry
pub struct PoolRegistry<C: Connector> {
    connector: Arc<C>,
    config: PoolConfig,
    slots: [RoleSlot<C>; 2],
}

impl<C: Connector> PoolRegistry<C> {
    pub fn new(connector: C, config: PoolConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            config,
            slots: [RoleSlot::new(), RoleSlot::new()],
        }
    }

    pub fn from_config(connector: C, mysql: &MysqlConfig) -> Self {
        Self::new(connector, pool_config(mysql))
    }

    pub fn connector(&self) -> &Arc<C> {
        &self.connector
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn slot(&self, role: Role) -> &RoleSlot<C> {
        &self.slots[role.index()]
    }

    /// Return the open pool for `role`, building it if there is none.
    ///
    /// Construction warms the pool up to its minimum size; if that fails
    /// nothing is registered and the next call tries again.
    pub async fn ensure_pool(&self, role: Role) -> Result<Arc<RolePool<C>>, PoolError<sqlx::Error>> {
        let slot = self.slot(role);
        if let Some(pool) = slot.open_pool().await {
            return Ok(pool);
        }

        let _init = slot.init.lock().await;
        if let Some(pool) = slot.open_pool().await {
            return Ok(pool);
        }

        let factory = RoleFactory {
            connector: Arc::clone(&self.connector),
            role,
        };
        match ResourcePool::new(factory, self.config.clone()).await {
            Ok(pool) => {
                *slot.current.write().await = Some(Arc::clone(&pool));
                let generation = slot.generation.fetch_add(1, Ordering::AcqRel) + 1;
                tracing::info!(
                    role = %role,
                    generation,
                    min = self.config.min_size,
                    max = self.config.max_size,
                    "connection pool created"
                );
                Ok(pool)
            }
            Err(err) => {
                tracing::error!(role = %role, error = %err, "failed to create connection pool");
                Err(err)
            }
        }
    }

    /// The registered pool for `role`, open or not, without building one
    pub async fn current(&self, role: Role) -> Option<Arc<RolePool<C>>> {
        (*self.slot(role).current.read().await).clone()
    }

    /// Number of pools built for `role` so far
    pub fn generation(&self, role: Role) -> u64 {
        self.slot(role).generation.load(Ordering::Acquire)
    }

    /// Close the pool for `role`; the next `ensure_pool` builds a new one
    pub async fn close(&self, role: Role) {
        let slot = self.slot(role);
        let _init = slot.init.lock().await;
        let pool = slot.current.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!(role = %role, "connection pool closed");
        }
    }

    pub async fn close_all(&self) {
        for role in Role::ALL {
            self.close(role).await;
        }
    }

    /// Close idle connections past the idle timeout in every open pool
    pub async fn reap_idle(&self) -> usize {
        let mut reaped = 0;
        for role in Role::ALL {
            if let Some(pool) = self.slot(role).open_pool().await {
                reaped += pool.reap_idle().await;
            }
        }
        reaped
    }

    pub async fn stats(&self, role: Role) -> Option<PoolStats> {
        self.current(role).await.map(|pool| pool.stats())
    }
}
