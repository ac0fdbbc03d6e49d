//! In-memory connector used by the unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use resource_pool::Resource;
use tokio::sync::Notify;

use crate::connector::Connector;
use crate::role::Role;

#[derive(Default)]
pub(crate) struct FakeState {
    read_connects: AtomicUsize,
    write_connects: AtomicUsize,
    closed: AtomicUsize,
    pings: AtomicUsize,
    refuse: AtomicBool,
    write_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeState {
    pub(crate) fn connects(&self, role: Role) -> usize {
        match role {
            Role::Read => self.read_connects.load(Ordering::SeqCst),
            Role::Write => self.write_connects.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub(crate) fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Park every write connect until the returned gate is notified
    pub(crate) fn gate_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.write_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn write_gate(&self) -> Option<Arc<Notify>> {
        self.write_gate.lock().unwrap().clone()
    }
}

pub(crate) struct FakeConnection {
    pub(crate) id: usize,
    pub(crate) role: Role,
    broken: Arc<AtomicBool>,
    // closed by the server without the connection noticing
    gone: Arc<AtomicBool>,
    state: Arc<FakeState>,
}

impl FakeConnection {
    /// Flag that breaks this connection later, e.g. while it sits idle
    pub(crate) fn breaker(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.broken)
    }

    /// Flag that drops this connection server-side; only a ping notices
    pub(crate) fn server_side_close(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.gone)
    }
}

#[async_trait]
impl Resource for FakeConnection {
    fn is_healthy(&self) -> bool {
        !self.broken.load(Ordering::SeqCst)
    }

    async fn check_liveness(&mut self) -> bool {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        self.is_healthy() && !self.gone.load(Ordering::SeqCst)
    }

    async fn close(self) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct FakeConnector {
    state: Arc<FakeState>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(FakeState::default()),
        }
    }

    pub(crate) fn state(&self) -> Arc<FakeState> {
        Arc::clone(&self.state)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Connection = FakeConnection;

    async fn connect(&self, role: Role) -> Result<FakeConnection, sqlx::Error> {
        // widen the window for racing constructors
        tokio::time::sleep(Duration::from_millis(2)).await;
        if role == Role::Write {
            if let Some(gate) = self.state.write_gate() {
                gate.notified().await;
            }
        }

        if self.state.refuse.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        let counter = match role {
            Role::Read => &self.state.read_connects,
            Role::Write => &self.state.write_connects,
        };
        let id = counter.fetch_add(1, Ordering::SeqCst) + 1;

        Ok(FakeConnection {
            id,
            role,
            broken: Arc::new(AtomicBool::new(false)),
            gone: Arc::new(AtomicBool::new(false)),
            state: Arc::clone(&self.state),
        })
    }
}
