//! Integration tests for pool lifecycle and checkout behavior
//!
//! Uses an in-memory connector, so no database server is needed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use splithaus::prelude::*;

#[derive(Default)]
struct Server {
    opened: AtomicUsize,
    closed: AtomicUsize,
    down: AtomicBool,
}

struct Session {
    id: usize,
    role: Role,
    dropped: Arc<AtomicBool>,
    server: Arc<Server>,
}

#[async_trait::async_trait]
impl Resource for Session {
    fn is_healthy(&self) -> bool {
        !self.dropped.load(Ordering::SeqCst)
    }

    async fn close(self) {
        self.server.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct ServerConnector {
    server: Arc<Server>,
}

#[async_trait::async_trait]
impl Connector for ServerConnector {
    type Connection = Session;

    async fn connect(&self, role: Role) -> Result<Session, sqlx::Error> {
        tokio::time::sleep(Duration::from_millis(1)).await;
        if self.server.down.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "server down",
            )));
        }
        let id = self.server.opened.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Session {
            id,
            role,
            dropped: Arc::new(AtomicBool::new(false)),
            server: Arc::clone(&self.server),
        })
    }
}

fn setup(config: PoolConfig) -> (Arc<ConnectionBroker<ServerConnector>>, Arc<Server>) {
    let server = Arc::new(Server::default());
    let connector = ServerConnector {
        server: Arc::clone(&server),
    };
    let registry = Arc::new(PoolRegistry::new(connector, config));
    (Arc::new(ConnectionBroker::new(registry)), server)
}

fn small_pool() -> PoolConfig {
    PoolConfig::new(1, 3).with_acquire_timeout(Some(Duration::from_millis(100)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_checkouts_share_one_pool_per_role() -> anyhow::Result<()> {
    let (broker, _server) = setup(PoolConfig::new(2, 8));

    let mut tasks = Vec::new();
    for i in 0..64 {
        let broker = Arc::clone(&broker);
        let role = if i % 2 == 0 { Role::Read } else { Role::Write };
        tasks.push(tokio::spawn(async move {
            let conn = broker.checkout(role).await?;
            assert_eq!(conn.role, role);
            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok::<_, StoreError>(())
        }));
    }
    for task in tasks {
        task.await??;
    }

    let registry = broker.registry();
    assert_eq!(registry.generation(Role::Read), 1);
    assert_eq!(registry.generation(Role::Write), 1);

    let read = registry.current(Role::Read).await.expect("read pool");
    let stats = read.stats();
    assert_eq!(stats.borrows, 32);
    assert!(stats.created <= 8);
    Ok(())
}

#[tokio::test]
async fn test_stale_connection_never_reaches_caller() -> anyhow::Result<()> {
    let (broker, server) = setup(small_pool());

    let conn = broker.checkout(Role::Read).await?;
    let first = conn.id;
    let dropped = Arc::clone(&conn.dropped);
    drop(conn);

    dropped.store(true, Ordering::SeqCst);

    let conn = broker.checkout(Role::Read).await?;
    assert!(conn.is_healthy());
    assert_ne!(conn.id, first);
    assert_eq!(server.closed.load(Ordering::SeqCst), 1);
    assert_eq!(broker.stale_replaced(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_construction_leaves_no_pool_behind() -> anyhow::Result<()> {
    let (broker, server) = setup(small_pool());
    server.down.store(true, Ordering::SeqCst);

    let err = broker.checkout(Role::Write).await.unwrap_err();
    assert!(matches!(err, StoreError::PoolUnavailable { .. }));
    assert!(err.is_connectivity());
    assert!(broker.registry().current(Role::Write).await.is_none());

    server.down.store(false, Ordering::SeqCst);
    let conn = broker.checkout(Role::Write).await?;
    assert!(conn.is_healthy());
    assert_eq!(broker.registry().generation(Role::Write), 1);
    Ok(())
}

#[tokio::test]
async fn test_released_connection_is_borrowed_again() -> anyhow::Result<()> {
    let (broker, _server) = setup(PoolConfig::new(0, 1).with_acquire_timeout(Some(Duration::from_millis(30))));

    let conn = broker.checkout(Role::Read).await?;
    let id = conn.id;

    // the only slot is taken
    let err = broker.checkout(Role::Read).await.unwrap_err();
    assert!(matches!(err, StoreError::Checkout { ref source, .. } if source.is_timeout()));

    drop(conn);
    let conn = broker.checkout(Role::Read).await?;
    assert_eq!(conn.id, id);
    Ok(())
}

#[tokio::test]
async fn test_waiting_checkout_proceeds_when_slot_frees() -> anyhow::Result<()> {
    let (broker, _server) = setup(PoolConfig::new(0, 1).with_acquire_timeout(None));

    let conn = broker.checkout(Role::Write).await?;
    let waiter = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move { broker.checkout(Role::Write).await.map(|conn| conn.id) })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    let id = conn.id;
    drop(conn);
    assert_eq!(waiter.await??, id);
    Ok(())
}

#[tokio::test]
async fn test_dropped_checkout_future_gives_up_its_place() -> anyhow::Result<()> {
    let (broker, _server) = setup(PoolConfig::new(0, 1).with_acquire_timeout(None));

    let conn = broker.checkout(Role::Read).await?;
    let pending = tokio::time::timeout(Duration::from_millis(20), broker.checkout(Role::Read)).await;
    assert!(pending.is_err());

    drop(conn);
    let pool = broker.registry().current(Role::Read).await.expect("read pool");
    assert_eq!(pool.available(), 1);
    Ok(())
}

#[tokio::test]
async fn test_closed_pool_is_replaced_transparently() -> anyhow::Result<()> {
    let (broker, _server) = setup(small_pool());

    broker.checkout(Role::Read).await?;
    broker.registry().close(Role::Read).await;

    let conn = broker.checkout(Role::Read).await?;
    assert!(conn.is_healthy());
    assert_eq!(broker.registry().generation(Role::Read), 2);
    Ok(())
}

#[tokio::test]
async fn test_idle_expired_connection_is_reopened() -> anyhow::Result<()> {
    let config = PoolConfig::new(1, 2)
        .with_idle_timeout(Some(Duration::from_millis(20)))
        .with_acquire_timeout(Some(Duration::from_millis(100)));
    let (broker, server) = setup(config);

    let first = broker.checkout(Role::Write).await?.id;
    tokio::time::sleep(Duration::from_millis(40)).await;

    let conn = broker.checkout(Role::Write).await?;
    assert_ne!(conn.id, first);
    assert_eq!(server.closed.load(Ordering::SeqCst), 1);

    let pool = broker.registry().current(Role::Write).await.expect("write pool");
    assert_eq!(pool.stats().idle_expired, 1);
    Ok(())
}

#[tokio::test]
async fn test_splithaus_hands_out_prefixed_tables() -> anyhow::Result<()> {
    let mut config = AppConfig::default();
    config.mysql.prefix = "shop_".to_string();
    let splithaus = SplitHaus::new(config)?;

    let orders = splithaus.table("order")?;
    assert_eq!(orders.table().as_str(), "shop_order");

    let err = splithaus.table("").unwrap_err();
    assert!(matches!(err, SplitHausError::Store(StoreError::EmptyTableName)));

    // nothing has connected yet
    let stats = splithaus.stats().await;
    assert_eq!(stats, SplitHausStats::default());
    Ok(())
}

#[tokio::test]
async fn test_splithaus_rejects_invalid_config() {
    let mut config = AppConfig::default();
    config.mysql.pool_min_active = 10;
    config.mysql.pool_max_active = 1;

    let err = SplitHaus::new(config).err().expect("invalid config");
    assert!(matches!(err, SplitHausError::Config(_)));
}
