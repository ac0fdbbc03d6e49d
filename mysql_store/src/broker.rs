//! Checkout coordinator
//!
//! Every connection handed to a caller has passed its health check. A
//! borrowed connection that fails it is replaced by exactly one freshly
//! opened connection, which takes over the stale one's pool slot.
//!
//! Connections only learn they are broken when a statement fails on them,
//! and the pool drops those when they are returned. A connection the server
//! closed while it sat idle still looks healthy, so with a liveness check
//! configured, connections that were idle at least that long are pinged
//! before they are handed out. A pool closed between lookup and borrow is
//! rebuilt once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use resource_pool::{PoolError, Pooled, Resource};

use crate::connector::Connector;
use crate::errors::StoreError;
use crate::registry::{PoolRegistry, RoleFactory, RolePool};
use crate::role::Role;

/// A checked-out connection; dropping it returns the connection to its pool
pub type PooledConnection<C> = Pooled<RoleFactory<C>>;

pub struct ConnectionBroker<C: Connector> {
    registry: Arc<PoolRegistry<C>>,
    liveness_after: Option<Duration>,
    stale_replaced: AtomicU64,
}

impl<C: Connector> ConnectionBroker<C> {
    pub fn new(registry: Arc<PoolRegistry<C>>) -> Self {
        Self {
            registry,
            liveness_after: None,
            stale_replaced: AtomicU64::new(0),
        }
    }

    /// Ping connections that sat idle for at least `after` before handing them out
    pub fn with_liveness_check(mut self, after: Duration) -> Self {
        self.liveness_after = Some(after);
        self
    }

    pub fn registry(&self) -> &Arc<PoolRegistry<C>> {
        &self.registry
    }

    /// Stale connections replaced so far
    pub fn stale_replaced(&self) -> u64 {
        self.stale_replaced.load(Ordering::Relaxed)
    }

    /// Check out a healthy connection, waiting at most the pool's wait timeout
    pub async fn checkout(&self, role: Role) -> Result<PooledConnection<C>, StoreError> {
        self.acquire(role, None).await
    }

    /// Check out a healthy connection, waiting at most `timeout` for a free slot
    pub async fn checkout_within(
        &self,
        role: Role,
        timeout: Duration,
    ) -> Result<PooledConnection<C>, StoreError> {
        self.acquire(role, Some(timeout)).await
    }

    async fn acquire(
        &self,
        role: Role,
        timeout: Option<Duration>,
    ) -> Result<PooledConnection<C>, StoreError> {
        let mut rebuilt = false;
        loop {
            let pool = self.pool(role).await?;
            let result = match timeout {
                Some(timeout) => pool.get_timeout(timeout).await,
                None => pool.get().await,
            };

            match result {
                Ok(handle) => return self.ensure_healthy(role, handle).await,
                Err(PoolError::Closed) if !rebuilt => {
                    tracing::debug!(role = %role, "pool closed during checkout, rebuilding");
                    rebuilt = true;
                }
                Err(source) => {
                    tracing::error!(role = %role, error = %source, "failed to check out connection");
                    return Err(StoreError::Checkout { role, source });
                }
            }
        }
    }

    async fn pool(&self, role: Role) -> Result<Arc<RolePool<C>>, StoreError> {
        self.registry.ensure_pool(role).await.map_err(|source| {
            tracing::error!(role = %role, error = %source, "connection pool unavailable");
            StoreError::PoolUnavailable { role, source }
        })
    }

    async fn is_usable(&self, handle: &mut PooledConnection<C>) -> bool {
        if !handle.is_healthy() {
            return false;
        }
        match self.liveness_after {
            Some(after) if handle.idle_for() >= after => handle.check_liveness().await,
            _ => true,
        }
    }

    async fn ensure_healthy(
        &self,
        role: Role,
        mut handle: PooledConnection<C>,
    ) -> Result<PooledConnection<C>, StoreError> {
        if self.is_usable(&mut handle).await {
            return Ok(handle);
        }

        tracing::warn!(
            role = %role,
            age_ms = handle.age().as_millis() as u64,
            idle_ms = handle.idle_for().as_millis() as u64,
            "stale connection detected, reconnecting"
        );

        match self.registry.connector().connect(role).await {
            Ok(fresh) => {
                let stale = handle.swap(fresh);
                stale.close().await;
                self.stale_replaced.fetch_add(1, Ordering::Relaxed);
                Ok(handle)
            }
            Err(source) => {
                handle.discard().close().await;
                tracing::error!(role = %role, error = %source, "failed to replace stale connection");
                Err(StoreError::Reconnect { role, source })
            }
        }
    }
}
