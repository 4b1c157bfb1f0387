use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::config::{Config, RuntimeMode};

/// Host suffix of the managed PostgreSQL provider that always requires TLS
const MANAGED_HOST_SUFFIX: &str = "neon.tech";

/// Whether the store is currently reachable
///
/// Only the pool wrapper can flip it; everything else reads it through
/// [`Database::is_connected`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionState(Arc<AtomicBool>);

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, connected: bool) {
        self.0.store(connected, Ordering::Release);
    }
}

/// Signals that decide whether connections must use TLS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TlsPolicy {
    pub force: bool,
    pub production: bool,
}

impl TlsPolicy {
    pub fn requires_tls(&self, host: &str) -> bool {
        self.force || self.production || host.ends_with(MANAGED_HOST_SUFFIX)
    }
}

/// Pool sizing and connection settings
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub database_url: String,
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub tls: TlsPolicy,
}

impl From<&Config> for PoolSettings {
    fn from(config: &Config) -> Self {
        Self {
            database_url: config.database_url.clone(),
            max_connections: config.pg_pool_max,
            idle_timeout: config.idle_timeout(),
            connect_timeout: config.connect_timeout(),
            tls: TlsPolicy {
                force: config.pg_force_ssl,
                production: config.app_env.is_production(),
            },
        }
    }
}

impl PoolSettings {
    fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        let options = PgConnectOptions::from_str(&self.database_url)?;
        if self.tls.requires_tls(options.get_host()) {
            // Managed providers use certificates we don't pin; encrypt without verifying.
            Ok(options.ssl_mode(PgSslMode::Require))
        } else {
            Ok(options)
        }
    }
}

/// Process-wide PostgreSQL pool with a connectivity gate
///
/// Construction never fails: when the pool cannot be built, or the store
/// turns out to be unreachable, the wrapper stays "not connected" and the
/// query facade answers empty results instead of erroring.
#[derive(Clone)]
pub struct Database {
    pub(super) pool: Option<PgPool>,
    pub(super) state: ConnectionState,
    pub(super) mode: RuntimeMode,
}

impl Database {
    /// Creates the pool lazily from settings
    ///
    /// No connection is opened here; call [`Database::test_connection`] to
    /// verify reachability and enable query forwarding.
    pub fn connect(settings: &PoolSettings, mode: RuntimeMode) -> Self {
        let pool = match settings.connect_options() {
            Ok(options) => Some(
                PgPoolOptions::new()
                    .max_connections(settings.max_connections)
                    .idle_timeout(settings.idle_timeout)
                    .acquire_timeout(settings.connect_timeout)
                    .connect_lazy_with(options),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid database configuration, continuing without database");
                None
            }
        };

        Self {
            pool,
            state: ConnectionState::default(),
            mode,
        }
    }

    /// A wrapper that never had a pool
    pub fn disconnected(mode: RuntimeMode) -> Self {
        Self {
            pool: None,
            state: ConnectionState::default(),
            mode,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Checks out and returns one connection to verify the store is reachable
    ///
    /// Updates the connectivity state and never fails; errors are logged.
    pub async fn test_connection(&self) -> bool {
        let Some(pool) = &self.pool else {
            tracing::warn!("No database pool configured, server will continue without database");
            self.state.set(false);
            return false;
        };

        match pool.acquire().await {
            Ok(conn) => {
                drop(conn);
                tracing::info!("Successfully connected to PostgreSQL database");
                self.state.set(true);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Database connection failed, server will continue without database");
                self.state.set(false);
                false
            }
        }
    }

    /// Runs embedded migrations when the store is reachable
    pub async fn migrate(&self) {
        let Some(pool) = self.pool.as_ref().filter(|_| self.is_connected()) else {
            tracing::debug!("Skipping migrations, database not available");
            return;
        };

        match sqlx::migrate!("./migrations").run(pool).await {
            Ok(()) => tracing::info!("Database migrations applied"),
            Err(e) => tracing::error!(error = %e, "Database migrations failed"),
        }
    }

    /// Closes every pooled connection; no-op when never connected
    pub async fn shutdown(&self) {
        if !self.is_connected() {
            return;
        }

        if let Some(pool) = &self.pool {
            tracing::info!("Closing database connections");
            pool.close().await;
            self.state.set(false);
            tracing::info!("Database connections closed");
        }
    }
}
