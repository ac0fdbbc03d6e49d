//! # Configuration Management for SplitHaus
//!
//! This crate provides the configuration structures for the read/write split
//! MySQL layer: the replica (slave) and primary (master) endpoints, shared
//! credentials, table prefix, pool sizing and the global debug switch.
//!
//! ## TOML File Configuration
//! ```toml
//! [default]
//! debug = false
//!
//! [mysql]
//! slaveHost = "replica.internal"
//! slavePort = 3306
//! masterHost = "primary.internal"
//! masterPort = 3306
//! username = "app"
//! password = "secret"
//! dbname = "shop"
//! charset = "utf8mb4"
//! prefix = "shop_"
//! poolMinActive = 10
//! poolMaxActive = 50
//! poolIdleTimeout = 2000
//! poolWaitTimeout = 3000
//! ```
//!
//! Every key is optional; missing keys fall back to the defaults below.
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // .env -> SPLITHAUS_CONFIG -> ./splithaus.toml -> built-in defaults
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./splithaus.toml";
const CONFIG_PATH_ENV: &str = "SPLITHAUS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The `[default]` section
    #[serde(rename = "default")]
    pub general: GeneralConfig,
    pub mysql: MysqlConfig,
}

/// Process-wide switches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Turns on per-statement logging for every opened connection
    pub debug: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { debug: true }
    }
}

/// MySQL configuration shared by the read and write roles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MysqlConfig {
    pub slave_host: String,
    pub slave_port: u16,
    pub master_host: String,
    pub master_port: u16,
    pub username: String,
    pub password: String,
    pub dbname: String,
    pub charset: String,
    /// Prepended to every table name handed to the CRUD layer
    pub prefix: String,
    pub pool_min_active: usize,
    pub pool_max_active: usize,
    /// Milliseconds an idle connection may sit in a pool before it is recycled
    pub pool_idle_timeout: u64,
    /// Milliseconds a checkout waits for a free slot; 0 waits forever
    pub pool_wait_timeout: u64,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            slave_host: "localhost".to_string(),
            slave_port: 3306,
            master_host: "localhost".to_string(),
            master_port: 3306,
            username: "root".to_string(),
            password: "root".to_string(),
            dbname: "yiicms".to_string(),
            charset: "utf8mb4".to_string(),
            prefix: String::new(),
            pool_min_active: 100,
            pool_max_active: 200,
            pool_idle_timeout: 2000,
            pool_wait_timeout: 3000,
        }
    }
}

/// Host and port of one MySQL server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from the TOML file named in .env / the environment,
    /// then the default path, and finally fall back to built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(err.into());
            }
        }

        let config = if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            Self::from_file(&config_path)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mysql = &self.mysql;

        if mysql.slave_host.is_empty() || mysql.master_host.is_empty() {
            return Err(ConfigError::Invalid(
                "MySQL slaveHost and masterHost cannot be empty".to_string(),
            ));
        }
        if mysql.slave_port == 0 || mysql.master_port == 0 {
            return Err(ConfigError::Invalid(
                "MySQL slavePort and masterPort cannot be zero".to_string(),
            ));
        }
        if mysql.username.is_empty() {
            return Err(ConfigError::Invalid(
                "MySQL username cannot be empty".to_string(),
            ));
        }
        if mysql.dbname.is_empty() {
            return Err(ConfigError::Invalid(
                "MySQL dbname cannot be empty".to_string(),
            ));
        }
        if mysql.charset.is_empty() {
            return Err(ConfigError::Invalid(
                "MySQL charset cannot be empty".to_string(),
            ));
        }
        if mysql.pool_max_active == 0 {
            return Err(ConfigError::Invalid(
                "MySQL poolMaxActive must be greater than 0".to_string(),
            ));
        }
        if mysql.pool_min_active > mysql.pool_max_active {
            return Err(ConfigError::Invalid(
                "MySQL poolMinActive cannot be greater than poolMaxActive".to_string(),
            ));
        }
        if mysql.pool_idle_timeout == 0 {
            return Err(ConfigError::Invalid(
                "MySQL poolIdleTimeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn debug(&self) -> bool {
        self.general.debug
    }
}

impl MysqlConfig {
    /// Replica endpoint used by the read role
    pub fn read_endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.slave_host.clone(),
            port: self.slave_port,
        }
    }

    /// Primary endpoint used by the write role
    pub fn write_endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.master_host.clone(),
            port: self.master_port,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_idle_timeout)
    }

    /// `None` means a checkout waits until a slot frees up
    pub fn wait_timeout(&self) -> Option<Duration> {
        match self.pool_wait_timeout {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Build a display-safe address (no credentials) for logs
    pub fn display_address(&self, endpoint: &Endpoint) -> String {
        format!(
            "mysql://{}:***@{}:{}/{}",
            self.username, endpoint.host, endpoint.port, self.dbname
        )
    }
}
