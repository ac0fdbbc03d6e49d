//! Connection factory
//!
//! Opens single MySQL connections for a role. Table names are used exactly
//! as given (no pluralization happens anywhere in this crate) and statement
//! logging follows the global `debug` switch. Failures are logged and
//! returned; nothing here retries.

use async_trait::async_trait;
use config::{AppConfig, MysqlConfig};
use resource_pool::Resource;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};

use crate::role::Role;

/// Opens connections for a role
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: Resource;

    async fn connect(&self, role: Role) -> Result<Self::Connection, sqlx::Error>;
}

/// Errors after which a connection can no longer be trusted
pub fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) | sqlx::Error::WorkerCrashed
    )
}

/// An open MySQL connection plus the last connection-level error seen on it
pub struct MysqlConnection {
    inner: MySqlConnection,
    role: Role,
    last_error: Option<String>,
}

impl MysqlConnection {
    pub fn new(inner: MySqlConnection, role: Role) -> Self {
        Self {
            inner,
            role,
            last_error: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The driver connection, usable as a sqlx executor
    pub fn connection(&mut self) -> &mut MySqlConnection {
        &mut self.inner
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Pass a driver result through, remembering connection-level failures.
    ///
    /// A connection that saw one is reported unhealthy from then on, so the
    /// next checkout replaces it.
    pub fn observe<T>(&mut self, result: Result<T, sqlx::Error>) -> Result<T, sqlx::Error> {
        if let Err(err) = &result {
            if is_connection_error(err) {
                self.last_error = Some(err.to_string());
            }
        }
        result
    }

    /// Round-trip to the server
    pub async fn ping(&mut self) -> Result<(), sqlx::Error> {
        let result = self.inner.ping().await;
        self.observe(result)
    }
}

impl std::fmt::Debug for MysqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlConnection")
            .field("role", &self.role)
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[async_trait]
impl Resource for MysqlConnection {
    fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    // catches connections the server dropped while they sat idle
    async fn check_liveness(&mut self) -> bool {
        self.is_healthy() && self.ping().await.is_ok()
    }

    async fn close(self) {
        let role = self.role;
        if let Err(err) = self.inner.close().await {
            tracing::debug!(role = %role, error = %err, "error while closing MySQL connection");
        }
    }
}

/// Connection factory backed by the `[mysql]` configuration
#[derive(Debug, Clone)]
pub struct MysqlConnector {
    config: MysqlConfig,
    debug: bool,
}

impl MysqlConnector {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.mysql.clone(),
            debug: config.debug(),
        }
    }

    pub fn config(&self) -> &MysqlConfig {
        &self.config
    }

    /// Connect options for one role; the password never leaves this struct
    pub fn connect_options(&self, role: Role) -> MySqlConnectOptions {
        let endpoint = role.endpoint(&self.config);
        let options = MySqlConnectOptions::new()
            .host(&endpoint.host)
            .port(endpoint.port)
            .username(&self.config.username)
            .password(&self.config.password)
            .database(&self.config.dbname)
            .charset(&self.config.charset);

        if self.debug {
            options
        } else {
            options.disable_statement_logging()
        }
    }

    /// Masked address of the role's server, safe for logs
    pub fn display_address(&self, role: Role) -> String {
        self.config.display_address(&role.endpoint(&self.config))
    }
}

#[async_trait]
impl Connector for MysqlConnector {
    type Connection = MysqlConnection;

    async fn connect(&self, role: Role) -> Result<MysqlConnection, sqlx::Error> {
        match self.connect_options(role).connect().await {
            Ok(conn) => {
                tracing::debug!(role = %role, address = %self.display_address(role), "opened MySQL connection");
                Ok(MysqlConnection::new(conn, role))
            }
            Err(err) => {
                tracing::error!(
                    role = %role,
                    address = %self.display_address(role),
                    error = %err,
                    "failed to connect to MySQL"
                );
                Err(err)
            }
        }
    }
}
