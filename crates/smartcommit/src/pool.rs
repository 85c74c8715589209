//! Pool integration: reset-on-recycle via [`deadpool`].
//!
//! Pooling policy itself lives in deadpool; this module only contributes the
//! manager that creates wrapped connections and invokes the reset hook when a
//! connection returns to the pool. A connection whose reset fails (or that is
//! broken) is discarded rather than handed out again.

use std::time::Duration;

use deadpool::managed::{self, Metrics, RecycleError, RecycleResult};
use serde::{Deserialize, Serialize};

use crate::connection::SmartConnection;
use crate::error::{DriverError, Error, Result};
use crate::physical::PhysicalConnection;

/// Factory producing fresh physical connections for the pool.
pub trait Connect: Send + Sync {
    /// The physical connection type this factory produces.
    type Conn: PhysicalConnection + Send + 'static;

    /// Opens a new physical connection.
    fn connect(&self) -> std::result::Result<Self::Conn, DriverError>;
}

impl<F: Connect> Connect for std::sync::Arc<F> {
    type Conn = F::Conn;

    fn connect(&self) -> std::result::Result<Self::Conn, DriverError> {
        F::connect(self)
    }
}

/// Pool of deferred-transaction connections.
pub type Pool<F> = managed::Pool<SmartConnectionManager<F>>;
/// A borrowed pooled connection.
pub type PooledConnection<F> = managed::Object<SmartConnectionManager<F>>;

/// Pool configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_size: usize,
    /// Borrow acquisition timeout in seconds.
    pub wait_timeout_secs: u64,
    /// Connection establishment timeout in seconds.
    pub create_timeout_secs: u64,
    /// Reset-on-return timeout in seconds.
    pub recycle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            wait_timeout_secs: 10,
            create_timeout_secs: 30,
            recycle_timeout_secs: 5,
        }
    }
}

/// Environment variable names
mod vars {
    pub const POOL_SIZE: &str = "SMARTCOMMIT_POOL_SIZE";
    pub const WAIT_TIMEOUT_SECS: &str = "SMARTCOMMIT_WAIT_TIMEOUT_SECS";
    pub const CREATE_TIMEOUT_SECS: &str = "SMARTCOMMIT_CREATE_TIMEOUT_SECS";
    pub const RECYCLE_TIMEOUT_SECS: &str = "SMARTCOMMIT_RECYCLE_TIMEOUT_SECS";
}

impl PoolConfig {
    /// Loads the configuration from the environment, falling back to the
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(vars::POOL_SIZE)
            && let Ok(size) = raw.parse::<usize>()
            && size > 0
        {
            config.max_size = size;
        }
        if let Some(raw) = lookup(vars::WAIT_TIMEOUT_SECS)
            && let Ok(secs) = raw.parse::<u64>()
        {
            config.wait_timeout_secs = secs;
        }
        if let Some(raw) = lookup(vars::CREATE_TIMEOUT_SECS)
            && let Ok(secs) = raw.parse::<u64>()
        {
            config.create_timeout_secs = secs;
        }
        if let Some(raw) = lookup(vars::RECYCLE_TIMEOUT_SECS)
            && let Ok(secs) = raw.parse::<u64>()
        {
            config.recycle_timeout_secs = secs;
        }
        config
    }
}

/// Deadpool manager for deferred-transaction connections.
#[derive(Debug)]
pub struct SmartConnectionManager<F> {
    connector: F,
}

impl<F> SmartConnectionManager<F> {
    /// Creates a manager backed by the given connector.
    pub const fn new(connector: F) -> Self {
        Self { connector }
    }
}

impl<F: Connect> managed::Manager for SmartConnectionManager<F> {
    type Type = SmartConnection<F::Conn>;
    type Error = Error;

    async fn create(&self) -> Result<Self::Type> {
        let physical = self.connector.connect().map_err(Error::Execution)?;
        SmartConnection::new(physical)
    }

    async fn recycle(&self, conn: &mut Self::Type, _: &Metrics) -> RecycleResult<Error> {
        conn.reset_for_pool_return().map_err(|err| {
            tracing::warn!(error = %err, "discarding connection unfit for reuse");
            RecycleError::Backend(err)
        })
    }
}

/// Builds a pool over the given connector.
pub fn build_pool<F: Connect + 'static>(connector: F, config: &PoolConfig) -> Result<Pool<F>> {
    Pool::builder(SmartConnectionManager::new(connector))
        .max_size(config.max_size)
        .wait_timeout(Some(Duration::from_secs(config.wait_timeout_secs)))
        .create_timeout(Some(Duration::from_secs(config.create_timeout_secs)))
        .recycle_timeout(Some(Duration::from_secs(config.recycle_timeout_secs)))
        .runtime(deadpool::Runtime::Tokio1)
        .build()
        .map_err(|e| Error::Config(format!("could not build connection pool: {e}")))
}
