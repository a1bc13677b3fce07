//! Append-only event topics.
//!
//! Two topics exist, `likes` and `views`. Producers publish
//! [`OutboundMessage`]s and get one error per attempt; the ingestor reads
//! [`DeliveredMessage`]s after an opaque per-topic cursor.
//!
//! The production transport is Redis streams: `XADD {topic} * key {key}
//! payload {json}` to publish, `XRANGE {topic} ({cursor} + COUNT n` to read.

use std::collections::HashMap;
use std::sync::Arc;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use redis::streams::StreamRangeReply;
use thiserror::Error;
use tokio::sync::RwLock;

use super::StoreFuture;

/// Error text the broker uses when a partition has no leader.
pub const LEADER_NOT_AVAILABLE: &str = "Leader Not Available";

/// Redis reply codes reported while a primary is unavailable or failing over.
const TRANSIENT_CODES: [&str; 3] = ["MASTERDOWN", "CLUSTERDOWN", "TRYAGAIN"];

/// One publish attempt or read that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BrokerError {
    /// Machine-readable reply code, when the transport provides one.
    pub code: Option<String>,
    pub message: String,
}

impl BrokerError {
    #[must_use]
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

impl From<redis::RedisError> for BrokerError {
    fn from(error: redis::RedisError) -> Self {
        Self::new(error.code(), error.to_string())
    }
}

/// Default transient classifier: the "no leader available" condition.
#[must_use]
pub fn is_leader_unavailable(error: &BrokerError) -> bool {
    error
        .code
        .as_deref()
        .is_some_and(|code| TRANSIENT_CODES.contains(&code))
        || error.message.contains(LEADER_NOT_AVAILABLE)
}

/// A message to append to a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Unique message key; a retried publish resends the same key.
    pub key: String,
    /// JSON-encoded event.
    pub payload: String,
}

/// A message read back from a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredMessage {
    /// Position of this message; pass it to `read_after` to continue after it.
    pub cursor: String,
    pub payload: String,
}

/// Durable append-only topics.
pub trait EventBroker: Send + Sync {
    fn publish(&self, topic: &str, message: &OutboundMessage) -> StoreFuture<(), BrokerError>;

    /// Reads at most `max` messages strictly after `cursor` (from the start
    /// when `None`), oldest first.
    fn read_after(
        &self,
        topic: &str,
        cursor: Option<&str>,
        max: usize,
    ) -> StoreFuture<Vec<DeliveredMessage>, BrokerError>;
}

// =============================================================================
// In-Memory Broker
// =============================================================================

/// In-memory [`EventBroker`]; cursors are one-based message positions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    topics: Arc<RwLock<HashMap<String, Vec<OutboundMessage>>>>,
}

impl InMemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages ever appended to `topic`.
    pub async fn message_count(&self, topic: &str) -> usize {
        self.topics.read().await.get(topic).map_or(0, Vec::len)
    }
}

impl EventBroker for InMemoryBroker {
    fn publish(&self, topic: &str, message: &OutboundMessage) -> StoreFuture<(), BrokerError> {
        let topics = Arc::clone(&self.topics);
        let topic = topic.to_string();
        let message = message.clone();
        Box::pin(async move {
            topics.write().await.entry(topic).or_default().push(message);
            Ok(())
        })
    }

    fn read_after(
        &self,
        topic: &str,
        cursor: Option<&str>,
        max: usize,
    ) -> StoreFuture<Vec<DeliveredMessage>, BrokerError> {
        let topics = Arc::clone(&self.topics);
        let topic = topic.to_string();
        let start = cursor.map(str::parse::<usize>).transpose();
        Box::pin(async move {
            let start =
                start.map_err(|error| BrokerError::new(None, format!("invalid cursor: {error}")))?;
            let guard = topics.read().await;
            let Some(messages) = guard.get(&topic) else {
                return Ok(Vec::new());
            };
            Ok(messages
                .iter()
                .enumerate()
                .skip(start.unwrap_or(0))
                .take(max)
                .map(|(index, message)| DeliveredMessage {
                    cursor: (index + 1).to_string(),
                    payload: message.payload.clone(),
                })
                .collect())
        })
    }
}

// =============================================================================
// Redis Streams Broker
// =============================================================================

/// Redis streams implementation of [`EventBroker`]; cursors are stream ids.
#[derive(Clone)]
pub struct RedisStreamBroker {
    connection: ConnectionManager,
}

impl RedisStreamBroker {
    #[must_use]
    pub const fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

impl std::fmt::Debug for RedisStreamBroker {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("RedisStreamBroker").finish_non_exhaustive()
    }
}

impl EventBroker for RedisStreamBroker {
    fn publish(&self, topic: &str, message: &OutboundMessage) -> StoreFuture<(), BrokerError> {
        let mut connection = self.connection.clone();
        let topic = topic.to_string();
        let message = message.clone();
        Box::pin(async move {
            let id: String = connection
                .xadd(
                    &topic,
                    "*",
                    &[("key", &message.key), ("payload", &message.payload)],
                )
                .await?;
            tracing::debug!(%topic, %id, key = %message.key, "published event");
            Ok(())
        })
    }

    fn read_after(
        &self,
        topic: &str,
        cursor: Option<&str>,
        max: usize,
    ) -> StoreFuture<Vec<DeliveredMessage>, BrokerError> {
        let mut connection = self.connection.clone();
        let topic = topic.to_string();
        let start = cursor.map_or_else(|| "-".to_string(), |cursor| format!("({cursor}"));
        Box::pin(async move {
            let reply: StreamRangeReply = connection.xrange_count(&topic, &start, "+", max).await?;
            Ok(reply
                .ids
                .into_iter()
                .map(|entry| DeliveredMessage {
                    payload: entry.get::<String>("payload").unwrap_or_default(),
                    cursor: entry.id,
                })
                .collect())
        })
    }
}
