//! Application configuration.
//!
//! Configuration is loaded once at startup from environment variables (after
//! reading `.env` through `dotenvy`). Missing or invalid values fail with a
//! [`ConfigError`] naming the offending variable.
//!
//! # Environment Variables
//!
//! - `APP_HOST` / `APP_PORT`: bind address (`0.0.0.0:8080`)
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres`
//! - `DOCUMENT_MODE`: `in_memory` (default) | `redis`
//! - `BROKER_MODE`: `in_memory` (default) | `redis`
//! - `DATABASE_URL`: required when `STORAGE_MODE=postgres`
//! - `REDIS_URL`: required when `DOCUMENT_MODE` or `BROKER_MODE` is `redis`
//! - `JWT_PRIVATE_KEY_PATH` / `JWT_PUBLIC_KEY_PATH`: Ed25519 PEM files
//! - `PUBLISH_RETRY_DELAY_MS`, `INGEST_POLL_INTERVAL_MS`, `INGEST_BATCH_SIZE`
//! - `TOP_TASKS_LIMIT`, `TOP_USERS_LIMIT`, `REQUEST_TIMEOUT_MS`

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A mode variable has an unknown value.
    #[error("Invalid value '{value}' for {key}. Expected one of: {expected}")]
    InvalidMode {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A variable could not be parsed.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    /// `DATABASE_URL` is missing although `STORAGE_MODE=postgres`.
    #[error("DATABASE_URL environment variable is required when STORAGE_MODE=postgres")]
    MissingDatabaseUrl,

    /// `REDIS_URL` is missing although a Redis-backed mode was selected.
    #[error("REDIS_URL environment variable is required when DOCUMENT_MODE or BROKER_MODE is redis")]
    MissingRedisUrl,

    /// Only one half of the signing key pair was configured.
    #[error("JWT_PRIVATE_KEY_PATH and JWT_PUBLIC_KEY_PATH must be set together")]
    IncompleteKeyPair,
}

// =============================================================================
// Modes
// =============================================================================

/// Backend of the task ledger and the analytics store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    #[default]
    InMemory,
    Postgres,
}

impl FromStr for StorageMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(ConfigError::InvalidMode {
                key: "STORAGE_MODE",
                value: value.to_string(),
                expected: "in_memory, postgres",
            }),
        }
    }
}

/// Backend of the credential and session documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentMode {
    #[default]
    InMemory,
    Redis,
}

impl FromStr for DocumentMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            _ => Err(ConfigError::InvalidMode {
                key: "DOCUMENT_MODE",
                value: value.to_string(),
                expected: "in_memory, redis",
            }),
        }
    }
}

/// Transport of the `likes` and `views` topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrokerMode {
    #[default]
    InMemory,
    Redis,
}

impl FromStr for BrokerMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            _ => Err(ConfigError::InvalidMode {
                key: "BROKER_MODE",
                value: value.to_string(),
                expected: "in_memory, redis",
            }),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Paths of the PEM-encoded Ed25519 key pair used to sign session tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairPaths {
    /// PKCS#8 private key.
    pub private_key: PathBuf,
    /// SPKI public key.
    pub public_key: PathBuf,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub app_host: String,
    pub app_port: u16,
    pub storage_mode: StorageMode,
    pub document_mode: DocumentMode,
    pub broker_mode: BrokerMode,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    /// `None` means an ephemeral key pair is generated at startup.
    pub key_pair: Option<KeyPairPaths>,
    /// Pause between two attempts of a transiently failing publish.
    pub publish_retry_delay: Duration,
    pub ingest_poll_interval: Duration,
    pub ingest_batch_size: usize,
    pub top_tasks_limit: usize,
    pub top_users_limit: usize,
    /// Upper bound on a whole HTTP request, including publish retries.
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_host: "0.0.0.0".to_string(),
            app_port: 8080,
            storage_mode: StorageMode::default(),
            document_mode: DocumentMode::default(),
            broker_mode: BrokerMode::default(),
            database_url: None,
            redis_url: None,
            key_pair: None,
            publish_retry_delay: Duration::from_millis(10),
            ingest_poll_interval: Duration::from_millis(200),
            ingest_batch_size: 500,
            top_tasks_limit: 5,
            top_users_limit: 3,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// Creates a new configuration builder starting from the defaults.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is invalid or a URL required by the
    /// selected modes is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Empty and whitespace-only values are treated as unset.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let key_pair = match (read("JWT_PRIVATE_KEY_PATH"), read("JWT_PUBLIC_KEY_PATH")) {
            (Some(private_key), Some(public_key)) => Some(KeyPairPaths {
                private_key: PathBuf::from(private_key),
                public_key: PathBuf::from(public_key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteKeyPair),
        };

        let config = Self {
            app_host: read("APP_HOST").unwrap_or(defaults.app_host),
            app_port: parse_or("APP_PORT", read("APP_PORT"), defaults.app_port)?,
            storage_mode: read("STORAGE_MODE")
                .map(|value| value.parse::<StorageMode>())
                .transpose()?
                .unwrap_or_default(),
            document_mode: read("DOCUMENT_MODE")
                .map(|value| value.parse::<DocumentMode>())
                .transpose()?
                .unwrap_or_default(),
            broker_mode: read("BROKER_MODE")
                .map(|value| value.parse::<BrokerMode>())
                .transpose()?
                .unwrap_or_default(),
            database_url: read("DATABASE_URL"),
            redis_url: read("REDIS_URL"),
            key_pair,
            publish_retry_delay: millis_or(
                "PUBLISH_RETRY_DELAY_MS",
                read("PUBLISH_RETRY_DELAY_MS"),
                defaults.publish_retry_delay,
            )?,
            ingest_poll_interval: millis_or(
                "INGEST_POLL_INTERVAL_MS",
                read("INGEST_POLL_INTERVAL_MS"),
                defaults.ingest_poll_interval,
            )?,
            ingest_batch_size: parse_or(
                "INGEST_BATCH_SIZE",
                read("INGEST_BATCH_SIZE"),
                defaults.ingest_batch_size,
            )?,
            top_tasks_limit: parse_or(
                "TOP_TASKS_LIMIT",
                read("TOP_TASKS_LIMIT"),
                defaults.top_tasks_limit,
            )?,
            top_users_limit: parse_or(
                "TOP_USERS_LIMIT",
                read("TOP_USERS_LIMIT"),
                defaults.top_users_limit,
            )?,
            request_timeout: millis_or(
                "REQUEST_TIMEOUT_MS",
                read("REQUEST_TIMEOUT_MS"),
                defaults.request_timeout,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks that every URL required by the selected modes is present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDatabaseUrl`] or
    /// [`ConfigError::MissingRedisUrl`], or [`ConfigError::InvalidValue`]
    /// for a zero batch size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_mode == StorageMode::Postgres && self.database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        let needs_redis =
            self.document_mode == DocumentMode::Redis || self.broker_mode == BrokerMode::Redis;
        if needs_redis && self.redis_url.is_none() {
            return Err(ConfigError::MissingRedisUrl);
        }
        if self.ingest_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INGEST_BATCH_SIZE",
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the `host:port` string the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.map_or(Ok(default), |value| {
        value.parse().map_err(|error: T::Err| ConfigError::InvalidValue {
            key,
            message: error.to_string(),
        })
    })
}

fn millis_or(
    key: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let millis = value.map(|value| parse_or::<u64>(key, Some(value), 0)).transpose()?;
    Ok(millis.map_or(default, Duration::from_millis))
}

// =============================================================================
// Builder
// =============================================================================

/// Fluent builder for [`AppConfig`], mostly used by tests.
#[derive(Debug, Clone, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    #[must_use]
    pub const fn storage_mode(mut self, mode: StorageMode) -> Self {
        self.config.storage_mode = mode;
        self
    }

    #[must_use]
    pub const fn document_mode(mut self, mode: DocumentMode) -> Self {
        self.config.document_mode = mode;
        self
    }

    #[must_use]
    pub const fn broker_mode(mut self, mode: BrokerMode) -> Self {
        self.config.broker_mode = mode;
        self
    }

    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = Some(url.into());
        self
    }

    #[must_use]
    pub const fn publish_retry_delay(mut self, delay: Duration) -> Self {
        self.config.publish_retry_delay = delay;
        self
    }

    #[must_use]
    pub const fn ingest_batch_size(mut self, size: usize) -> Self {
        self.config.ingest_batch_size = size;
        self
    }

    #[must_use]
    pub const fn top_tasks_limit(mut self, limit: usize) -> Self {
        self.config.top_tasks_limit = limit;
        self
    }

    #[must_use]
    pub const fn top_users_limit(mut self, limit: usize) -> Self {
        self.config.top_users_limit = limit;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// Tests
// =============================================================================
