//! Stream ingestion from the broker topics into the analytics store.
//!
//! For each kind the ingestor reads the topic after the cursor last committed
//! to the analytics store, decodes the payloads and appends them together
//! with the new cursor. A crash between read and append only causes a
//! re-read, never a gap.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use super::{AnalyticsStore, BrokerError, EventBroker, StoreError};
use crate::domain::{EngagementEvent, EngagementKind};

/// Errors raised by one ingestion pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("failed to read topic: {0}")]
    Broker(#[from] BrokerError),

    #[error("failed to store events: {0}")]
    Storage(#[from] StoreError),
}

/// Moves events from the broker into the analytics store.
#[derive(Clone)]
pub struct StreamIngestor {
    broker: Arc<dyn EventBroker>,
    analytics: Arc<dyn AnalyticsStore>,
    batch_size: usize,
    poll_interval: Duration,
}

impl std::fmt::Debug for StreamIngestor {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StreamIngestor")
            .field("broker", &"Arc<dyn EventBroker>")
            .field("analytics", &"Arc<dyn AnalyticsStore>")
            .field("batch_size", &self.batch_size)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl StreamIngestor {
    #[must_use]
    pub fn new(
        broker: Arc<dyn EventBroker>,
        analytics: Arc<dyn AnalyticsStore>,
        batch_size: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            broker,
            analytics,
            batch_size: batch_size.max(1),
            poll_interval,
        }
    }

    /// Ingests everything currently available on both topics.
    ///
    /// Returns the number of events appended.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] on the first broker or store failure; batches
    /// appended before the failure stay committed.
    pub async fn drain_once(&self) -> Result<usize, IngestError> {
        let mut total = 0;
        for kind in EngagementKind::ALL {
            total += self.drain_topic(kind).await?;
        }
        Ok(total)
    }

    async fn drain_topic(&self, kind: EngagementKind) -> Result<usize, IngestError> {
        let mut appended = 0;
        loop {
            let cursor = self.analytics.cursor(kind).await?;
            let messages = self
                .broker
                .read_after(kind.topic(), cursor.as_deref(), self.batch_size)
                .await?;
            let Some(last) = messages.last() else {
                break;
            };
            let next_cursor = last.cursor.clone();
            let full_batch = messages.len() == self.batch_size;

            let events: Vec<EngagementEvent> = messages
                .iter()
                .filter_map(|message| {
                    serde_json::from_str(&message.payload)
                        .map_err(|error| {
                            tracing::warn!(
                                topic = kind.topic(),
                                cursor = %message.cursor,
                                %error,
                                "skipping undecodable event"
                            );
                        })
                        .ok()
                })
                .collect();
            appended += events.len();
            self.analytics.append(kind, events, next_cursor).await?;

            if !full_batch {
                break;
            }
        }
        if appended > 0 {
            tracing::debug!(topic = kind.topic(), appended, "ingested events");
        }
        Ok(appended)
    }

    /// Polls both topics until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(poll_interval = ?self.poll_interval, "stream ingestor started");
        loop {
            if let Err(error) = self.drain_once().await {
                tracing::error!(%error, "ingestion pass failed");
            }
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                () = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("stream ingestor stopped");
    }
}
