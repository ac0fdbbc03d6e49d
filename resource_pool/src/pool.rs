//! Bounded async resource pool
//!
//! A semaphore with `max_size` permits bounds how many resources can be on
//! loan at once; borrowers that find no free permit wait (the backpressure
//! point) until a guard is dropped, the timeout fires, or the pool closes.
//! Idle resources live in a deque ordered by the time they were returned,
//! so expired entries always sit at the front.

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::PoolConfig;
use crate::errors::PoolError;
use crate::resource::{Resource, ResourceFactory};
use crate::stats::{AtomicPoolStats, PoolStats};

struct IdleEntry<R> {
    resource: R,
    created_at: Instant,
    returned_at: Instant,
}

/// A bounded pool of resources produced by `F`
pub struct ResourcePool<F: ResourceFactory> {
    factory: F,
    config: PoolConfig,
    idle: Mutex<VecDeque<IdleEntry<F::Resource>>>,
    semaphore: Arc<Semaphore>,
    closed: AtomicBool,
    stats: AtomicPoolStats,
}

impl<F: ResourceFactory> fmt::Debug for ResourcePool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .field("idle", &self.idle_count())
            .field("available", &self.available())
            .finish()
    }
}

impl<F: ResourceFactory> ResourcePool<F> {
    /// Build a pool and warm it up with `min_size` resources.
    ///
    /// Any factory failure during warm-up closes what was already created
    /// and fails the whole construction.
    pub async fn new(factory: F, config: PoolConfig) -> Result<Arc<Self>, PoolError<F::Error>> {
        let pool = Arc::new(Self {
            factory,
            semaphore: Arc::new(Semaphore::new(config.max_size)),
            idle: Mutex::new(VecDeque::with_capacity(config.max_size)),
            closed: AtomicBool::new(false),
            stats: AtomicPoolStats::default(),
            config,
        });

        for _ in 0..pool.config.warm_size() {
            match pool.create().await {
                Ok(resource) => {
                    let now = Instant::now();
                    pool.lock_idle().push_back(IdleEntry {
                        resource,
                        created_at: now,
                        returned_at: now,
                    });
                }
                Err(err) => {
                    pool.close().await;
                    return Err(PoolError::Factory(err));
                }
            }
        }

        tracing::debug!(
            warm = pool.config.warm_size(),
            max = pool.config.max_size,
            "resource pool ready"
        );

        Ok(pool)
    }

    /// Borrow a resource, waiting at most the configured acquire timeout
    pub async fn get(self: &Arc<Self>) -> Result<Pooled<F>, PoolError<F::Error>> {
        self.acquire(self.config.acquire_timeout).await
    }

    /// Borrow a resource, waiting at most `timeout` for a free slot
    pub async fn get_timeout(
        self: &Arc<Self>,
        timeout: Duration,
    ) -> Result<Pooled<F>, PoolError<F::Error>> {
        self.acquire(Some(timeout)).await
    }

    async fn acquire(
        self: &Arc<Self>,
        timeout: Option<Duration>,
    ) -> Result<Pooled<F>, PoolError<F::Error>> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let started = Instant::now();
        let acquire = Arc::clone(&self.semaphore).acquire_owned();
        let permit = match timeout {
            Some(limit) => tokio::time::timeout(limit, acquire).await.map_err(|_| {
                self.stats.record_timeout();
                PoolError::Timeout(limit)
            })?,
            None => acquire.await,
        }
        .map_err(|_| PoolError::Closed)?;

        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let (expired, reusable) = {
            let mut idle = self.lock_idle();
            let expired = self.drain_expired(&mut idle);
            (expired, idle.pop_back())
        };
        for resource in expired {
            resource.close().await;
            self.stats.record_idle_expired();
        }

        let (resource, created_at, idle_for) = match reusable {
            Some(entry) => (entry.resource, entry.created_at, entry.returned_at.elapsed()),
            // permit is dropped with the error, so the slot frees up again
            None => (
                self.create().await.map_err(PoolError::Factory)?,
                Instant::now(),
                Duration::ZERO,
            ),
        };

        self.stats.record_borrow(started.elapsed());

        Ok(Pooled {
            resource: Some(resource),
            created_at,
            idle_for,
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    async fn create(&self) -> Result<F::Resource, F::Error> {
        let resource = self.factory.create().await?;
        self.stats.record_created();
        Ok(resource)
    }

    fn release(&self, resource: F::Resource, created_at: Instant) {
        if self.is_closed() || !resource.is_healthy() {
            drop(resource);
            self.stats.record_discarded();
            return;
        }

        self.lock_idle().push_back(IdleEntry {
            resource,
            created_at,
            returned_at: Instant::now(),
        });
    }

    fn drain_expired(&self, idle: &mut VecDeque<IdleEntry<F::Resource>>) -> Vec<F::Resource> {
        let Some(limit) = self.config.idle_timeout else {
            return Vec::new();
        };

        let mut expired = Vec::new();
        while idle
            .front()
            .is_some_and(|entry| entry.returned_at.elapsed() > limit)
        {
            if let Some(entry) = idle.pop_front() {
                expired.push(entry.resource);
            }
        }
        expired
    }

    /// Close idle resources that exceeded the idle timeout; returns how many
    pub async fn reap_idle(&self) -> usize {
        let expired = {
            let mut idle = self.lock_idle();
            self.drain_expired(&mut idle)
        };
        let count = expired.len();
        for resource in expired {
            resource.close().await;
            self.stats.record_idle_expired();
        }
        count
    }

    /// Close the pool.
    ///
    /// Waiting borrowers fail with [`PoolError::Closed`], idle resources are
    /// closed now, resources on loan are dropped when their guards return.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.semaphore.close();

        let drained: Vec<_> = self.lock_idle().drain(..).collect();
        for entry in drained {
            entry.resource.close().await;
            self.stats.record_closed();
        }

        tracing::debug!("resource pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<IdleEntry<F::Resource>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A borrowed resource; dropping it returns the resource to its pool
pub struct Pooled<F: ResourceFactory> {
    resource: Option<F::Resource>,
    created_at: Instant,
    idle_for: Duration,
    pool: Arc<ResourcePool<F>>,
    // released after `resource` is back in the idle deque
    _permit: OwnedSemaphorePermit,
}

impl<F: ResourceFactory> Pooled<F> {
    /// Put `fresh` into this slot and hand back the resource it replaces.
    ///
    /// The slot stays on loan; `fresh` is what goes back to the pool on drop.
    pub fn swap(&mut self, fresh: F::Resource) -> F::Resource {
        self.created_at = Instant::now();
        self.idle_for = Duration::ZERO;
        std::mem::replace(self.inner_mut(), fresh)
    }

    /// Take the resource out for good and free its slot
    pub fn discard(mut self) -> F::Resource {
        self.pool.stats.record_discarded();
        let resource = self.take_inner();
        drop(self);
        resource
    }

    /// The pool this resource belongs to
    pub fn pool(&self) -> &Arc<ResourcePool<F>> {
        &self.pool
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// How long the resource sat idle before this borrow; zero if newly created
    pub fn idle_for(&self) -> Duration {
        self.idle_for
    }

    fn inner(&self) -> &F::Resource {
        self.resource
            .as_ref()
            .expect("pooled resource is present until the guard is dropped")
    }

    fn inner_mut(&mut self) -> &mut F::Resource {
        self.resource
            .as_mut()
            .expect("pooled resource is present until the guard is dropped")
    }

    fn take_inner(&mut self) -> F::Resource {
        self.resource
            .take()
            .expect("pooled resource is present until the guard is dropped")
    }
}

impl<F: ResourceFactory> Deref for Pooled<F> {
    type Target = F::Resource;

    fn deref(&self) -> &Self::Target {
        self.inner()
    }
}

impl<F: ResourceFactory> DerefMut for Pooled<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner_mut()
    }
}

impl<F: ResourceFactory> fmt::Debug for Pooled<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("age", &self.age())
            .field("healthy", &self.resource.as_ref().map(|r| r.is_healthy()))
            .finish()
    }
}

impl<F: ResourceFactory> Drop for Pooled<F> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.release(resource, self.created_at);
        }
    }
}
