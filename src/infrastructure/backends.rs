//! Backend factory.
//!
//! Builds every store client once at process start according to the
//! configured modes and hands them out as trait objects.
//!
//! | Mode | `in_memory` | production |
//! |---|---|---|
//! | `STORAGE_MODE` | [`InMemoryTaskStore`], [`InMemoryAnalyticsStore`] | `PostgreSQL` |
//! | `DOCUMENT_MODE` | [`InMemoryCredentialStore`], [`InMemorySessionStore`] | Redis |
//! | `BROKER_MODE` | [`InMemoryBroker`] | Redis streams |

use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use super::{
    AnalyticsStore, AppConfig, BrokerMode, ConfigError, CredentialStore, DocumentMode,
    EventBroker, InMemoryAnalyticsStore, InMemoryBroker, InMemoryCredentialStore,
    InMemorySessionStore, InMemoryTaskStore, PostgresAnalyticsStore, PostgresTaskStore,
    RedisCredentialStore, RedisSessionStore, RedisStreamBroker, SessionStore, StorageMode,
    StoreError, StreamIngestor, TaskStore, ensure_schema,
};

const MAX_DATABASE_CONNECTIONS: u32 = 16;

/// Errors raised while connecting the backends.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    #[error("Redis connection error: {0}")]
    RedisConnection(String),

    #[error("Schema initialisation error: {0}")]
    Schema(#[from] StoreError),
}

/// Every constructed store, ready to be injected into the services.
#[derive(Clone)]
pub struct Backends {
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub broker: Arc<dyn EventBroker>,
    pub analytics: Arc<dyn AnalyticsStore>,
    pool: Option<PgPool>,
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Backends")
            .field("credentials", &"Arc<dyn CredentialStore>")
            .field("sessions", &"Arc<dyn SessionStore>")
            .field("tasks", &"Arc<dyn TaskStore>")
            .field("broker", &"Arc<dyn EventBroker>")
            .field("analytics", &"Arc<dyn AnalyticsStore>")
            .field("postgres", &self.pool.is_some())
            .finish()
    }
}

impl Backends {
    /// All-in-memory backends, used by tests and local development.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            credentials: Arc::new(InMemoryCredentialStore::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
            tasks: Arc::new(InMemoryTaskStore::new()),
            broker: Arc::new(InMemoryBroker::new()),
            analytics: Arc::new(InMemoryAnalyticsStore::new()),
            pool: None,
        }
    }

    /// Connects every backend selected by `config`.
    ///
    /// For `PostgreSQL` the schema is created if absent.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if a required URL is missing or a connection
    /// or schema statement fails.
    pub async fn connect(config: &AppConfig) -> Result<Self, BackendError> {
        config.validate()?;
        let mut backends = Self::in_memory();

        if config.storage_mode == StorageMode::Postgres {
            let url = config
                .database_url
                .as_deref()
                .ok_or(ConfigError::MissingDatabaseUrl)?;
            let pool = PgPoolOptions::new()
                .max_connections(MAX_DATABASE_CONNECTIONS)
                .connect(url)
                .await
                .map_err(|error| BackendError::DatabaseConnection(error.to_string()))?;
            ensure_schema(&pool).await?;
            backends.tasks = Arc::new(PostgresTaskStore::new(pool.clone()));
            backends.analytics = Arc::new(PostgresAnalyticsStore::new(pool.clone()));
            backends.pool = Some(pool);
            tracing::info!("connected to PostgreSQL");
        }

        let needs_redis =
            config.document_mode == DocumentMode::Redis || config.broker_mode == BrokerMode::Redis;
        if needs_redis {
            let connection = connect_redis(config).await?;
            if config.document_mode == DocumentMode::Redis {
                backends.credentials = Arc::new(RedisCredentialStore::new(connection.clone()));
                backends.sessions = Arc::new(RedisSessionStore::new(connection.clone()));
            }
            if config.broker_mode == BrokerMode::Redis {
                backends.broker = Arc::new(RedisStreamBroker::new(connection));
            }
            tracing::info!("connected to Redis");
        }

        Ok(backends)
    }

    /// Builds the ingestor feeding `analytics` from `broker`.
    #[must_use]
    pub fn ingestor(&self, config: &AppConfig) -> StreamIngestor {
        StreamIngestor::new(
            Arc::clone(&self.broker),
            Arc::clone(&self.analytics),
            config.ingest_batch_size,
            config.ingest_poll_interval,
        )
    }

    /// Releases pooled connections.
    pub async fn close(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
            tracing::info!("closed PostgreSQL pool");
        }
    }
}

async fn connect_redis(config: &AppConfig) -> Result<ConnectionManager, BackendError> {
    let url = config
        .redis_url
        .as_deref()
        .ok_or(ConfigError::MissingRedisUrl)?;
    let client =
        redis::Client::open(url).map_err(|error| BackendError::RedisConnection(error.to_string()))?;
    ConnectionManager::new(client)
        .await
        .map_err(|error| BackendError::RedisConnection(error.to_string()))
}
