//! Database layer for CPSU
//!
//! Provides:
//! - Connection supervision with a keep-alive task that swaps dead pools
//! - Reference lookup-or-create, flat-row aggregation and filtered queries
//! - Row models and the repository used by the services

pub mod aggregate;
pub mod lookup;
pub mod models;
pub mod query;
pub mod repository;

pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Owner of the live connection pool.
///
/// Requests take a shared handle through [`DbSupervisor::handle`]; the
/// keep-alive task replaces the pool under the write lock, so a request
/// sees either the old pool or the new one, never a partial swap. A
/// replaced pool closes once the last request holding it drops its handle.
#[derive(Clone)]
pub struct DbSupervisor {
    conn: Arc<RwLock<Arc<DatabaseConnection>>>,
    config: Option<Arc<DatabaseConfig>>,
}

impl DbSupervisor {
    /// Connect using the given configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!(
            host = %config.host,
            database = %config.name,
            "Connecting to database..."
        );

        let conn = open(config).await?;

        info!("Database connection established");

        Ok(Self {
            conn: Arc::new(RwLock::new(Arc::new(conn))),
            config: Some(Arc::new(config.clone())),
        })
    }

    /// Wrap an existing connection; such a supervisor cannot reconnect
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self {
            conn: Arc::new(RwLock::new(Arc::new(conn))),
            config: None,
        }
    }

    /// Short-lived handle for one request
    pub async fn handle(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&*self.conn.read().await)
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        let conn = self.handle().await;
        conn.execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;
        Ok(())
    }

    /// Open a fresh pool and swap it in
    pub async fn reconnect(&self) -> Result<()> {
        let config = self.config.as_ref().ok_or_else(|| AppError::Configuration {
            message: "database supervisor has no connection settings".to_string(),
        })?;

        let fresh = Arc::new(open(config).await?);
        let stale = {
            let mut guard = self.conn.write().await;
            std::mem::replace(&mut *guard, fresh)
        };

        // In-flight requests may still hold the old pool; it closes when the
        // last of them releases its handle
        drop(stale);

        metrics::record_reconnect();
        info!("Database connection replaced");
        Ok(())
    }

    /// Ping every `interval` and reconnect when the ping fails.
    /// In-flight operations that failed are not retried.
    pub fn spawn_keepalive(&self, interval: Duration) -> JoinHandle<()> {
        let supervisor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if let Err(e) = supervisor.ping().await {
                    warn!(error = %e, "Database ping failed, reconnecting");
                    if let Err(e) = supervisor.reconnect().await {
                        warn!(error = %e, "Database reconnect failed");
                    }
                }
            }
        })
    }

    /// Apply pending migrations from the workspace `migrations/` directory
    pub async fn run_migrations(&self) -> Result<()> {
        let conn = self.handle().await;
        sqlx::migrate!("../../migrations")
            .run(conn.get_postgres_connection_pool())
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Migration failed: {}", e),
            })?;

        info!("Database migrations applied");
        Ok(())
    }
}

async fn open(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(config.connection_url());
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .sqlx_logging(false);

    Database::connect(opts)
        .await
        .map_err(|e| AppError::DatabaseConnection {
            message: format!("Failed to connect: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_ping_through_handle() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let supervisor = DbSupervisor::from_connection(conn);
        assert!(supervisor.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_ping_failure_is_connection_error() {
        // No exec results queued: the mock reports an error
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let supervisor = DbSupervisor::from_connection(conn);

        let err = supervisor.ping().await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseConnection { .. }));
    }

    #[tokio::test]
    async fn test_reconnect_requires_settings() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let supervisor = DbSupervisor::from_connection(conn);

        let err = supervisor.reconnect().await.unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_handles_share_one_pool() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let supervisor = DbSupervisor::from_connection(conn);

        let first = supervisor.handle().await;
        let second = supervisor.handle().await;
        assert!(Arc::ptr_eq(&first, &second));

        // Request handles keep the pool alive after the supervisor is gone
        drop(supervisor);
        assert_eq!(Arc::strong_count(&first), 2);
    }
}
