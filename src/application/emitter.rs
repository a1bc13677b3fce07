//! Engagement emitter: publishes likes, views and bootstrap events.
//!
//! A publish that fails with an error the classifier marks as transient is
//! retried without bound, resending the identical message (same key, same
//! payload). Any other error is returned at once. The loop has no upper
//! bound of its own; callers bound it with a timeout, and the HTTP layer
//! does so for every request.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::{EngagementEvent, EngagementKind, TaskId, Username};
use crate::infrastructure::{BrokerError, EventBroker, OutboundMessage, is_leader_unavailable};

/// Decides whether a broker error is worth retrying.
pub type TransientClassifier = Arc<dyn Fn(&BrokerError) -> bool + Send + Sync>;

/// Errors raised while emitting an engagement event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("failed to encode event: {0}")]
    Encode(String),

    #[error("failed to publish {kind} event: {source}")]
    Publish {
        kind: EngagementKind,
        source: BrokerError,
    },
}

/// Publishes engagement events to the per-kind topics.
#[derive(Clone)]
pub struct EngagementEmitter {
    broker: Arc<dyn EventBroker>,
    is_transient: TransientClassifier,
    retry_delay: Duration,
}

impl std::fmt::Debug for EngagementEmitter {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("EngagementEmitter")
            .field("broker", &"Arc<dyn EventBroker>")
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl EngagementEmitter {
    /// Creates an emitter retrying on [`is_leader_unavailable`].
    #[must_use]
    pub fn new(broker: Arc<dyn EventBroker>, retry_delay: Duration) -> Self {
        Self {
            broker,
            is_transient: Arc::new(is_leader_unavailable),
            retry_delay,
        }
    }

    /// Replaces the transient-error classifier.
    #[must_use]
    pub fn with_classifier(mut self, is_transient: TransientClassifier) -> Self {
        self.is_transient = is_transient;
        self
    }

    /// Publishes the like and view bootstrap events of a new task.
    ///
    /// # Errors
    ///
    /// Returns the first [`EmitError`]; the view event is not attempted if
    /// the like event fails.
    pub async fn emit_bootstrap(&self, task_id: TaskId, owner: &Username) -> Result<(), EmitError> {
        let event = EngagementEvent::bootstrap(task_id, owner.clone());
        for kind in EngagementKind::ALL {
            self.publish(kind, &event).await?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`EmitError::Publish`] on a non-transient broker error.
    pub async fn emit_like(
        &self,
        actor: &Username,
        task_id: TaskId,
        owner: &Username,
    ) -> Result<(), EmitError> {
        let event = EngagementEvent::new(actor.clone(), task_id, owner.clone());
        self.publish(EngagementKind::Like, &event).await
    }

    /// # Errors
    ///
    /// Returns [`EmitError::Publish`] on a non-transient broker error.
    pub async fn emit_view(
        &self,
        actor: &Username,
        task_id: TaskId,
        owner: &Username,
    ) -> Result<(), EmitError> {
        let event = EngagementEvent::new(actor.clone(), task_id, owner.clone());
        self.publish(EngagementKind::View, &event).await
    }

    async fn publish(&self, kind: EngagementKind, event: &EngagementEvent) -> Result<(), EmitError> {
        let payload =
            serde_json::to_string(event).map_err(|error| EmitError::Encode(error.to_string()))?;
        let message = OutboundMessage {
            key: Uuid::new_v4().to_string(),
            payload,
        };

        let mut attempt: u64 = 1;
        loop {
            match self.broker.publish(kind.topic(), &message).await {
                Ok(()) => return Ok(()),
                Err(error) if (self.is_transient)(&error) => {
                    tracing::warn!(
                        topic = kind.topic(),
                        key = %message.key,
                        attempt,
                        %error,
                        "transient publish failure, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(source) => return Err(EmitError::Publish { kind, source }),
            }
        }
    }
}
