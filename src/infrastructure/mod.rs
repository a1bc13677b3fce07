//! Infrastructure layer.
//!
//! - **Stores**: capability traits for every external store, each with a
//!   production implementation (`PostgreSQL` or Redis) and an in-memory one
//! - **Tokens**: Ed25519 signer and the pluggable password hasher
//! - **Ingestion**: the stream ingestor that feeds the analytics store
//! - **Wiring**: configuration, backend factory and the dependency container
//!
//! Store traits return [`StoreFuture`], a boxed `'static` future, so every
//! implementation clones what it needs (pool, connection manager, `Arc`)
//! into the future instead of borrowing `self`.

mod analytics;
mod backends;
mod broker;
mod config;
mod dependencies;
mod documents;
mod ingest;
mod password;
mod schema;
mod signing;
mod tasks;

use futures::future::BoxFuture;
use thiserror::Error;

pub use analytics::{
    AnalyticsStore, AuthorLikeRows, InMemoryAnalyticsStore, PostgresAnalyticsStore, RankedTask,
};
pub use backends::{BackendError, Backends};
pub use broker::{
    BrokerError, DeliveredMessage, EventBroker, InMemoryBroker, OutboundMessage,
    RedisStreamBroker, is_leader_unavailable,
};
pub use config::{
    AppConfig, AppConfigBuilder, BrokerMode, ConfigError, DocumentMode, KeyPairPaths, StorageMode,
};
pub use dependencies::AppDependencies;
pub use documents::{
    CredentialStore, InMemoryCredentialStore, InMemorySessionStore, RedisCredentialStore,
    RedisSessionStore, SessionStore,
};
pub use ingest::{IngestError, StreamIngestor};
pub use password::{PasswordHasher, SaltedSha256Hasher};
pub use schema::ensure_schema;
pub use signing::{SessionClaims, SigningError, TokenError, TokenSigner};
pub use tasks::{InMemoryTaskStore, MutationOutcome, PostgresTaskStore, TaskStore};

/// Future returned by every store operation.
pub type StoreFuture<T, E = StoreError> = BoxFuture<'static, Result<T, E>>;

/// Errors shared by the credential, session, task and analytics stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Relational store failure (connection, query, commit).
    #[error("database error: {0}")]
    Database(String),

    /// Document store failure.
    #[error("document store error: {0}")]
    Document(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An insert collided with an existing key.
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database(error.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        Self::Document(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
