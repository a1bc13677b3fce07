//! Engagement events: likes and views of a task.
//!
//! Every user action appends one [`EngagementEvent`] to the stream of its
//! [`EngagementKind`]. Creating a task appends two extra events, one per
//! kind, from [`BOOTSTRAP_ACTOR`], so that every existing task has a
//! non-empty baseline in the analytics store. The read side subtracts that
//! baseline again (see [`crate::domain::statistics`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{TaskId, Username};

/// Reserved actor used for bootstrap events.
///
/// It contains `~`, which [`Username::parse`] rejects, so no client can
/// register it or act as it.
pub const BOOTSTRAP_ACTOR: &str = "~statistics-bootstrap~";

/// Error returned when parsing an unknown engagement kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("there is no statistic named `{0}`")]
pub struct UnknownEngagementKind(pub String);

/// The two engagement streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementKind {
    Like,
    View,
}

impl EngagementKind {
    /// Both kinds, in reporting order.
    pub const ALL: [Self; 2] = [Self::Like, Self::View];

    /// Name of the append-only topic carrying events of this kind.
    #[must_use]
    pub const fn topic(self) -> &'static str {
        match self {
            Self::Like => "likes",
            Self::View => "views",
        }
    }
}

impl fmt::Display for EngagementKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.topic())
    }
}

impl FromStr for EngagementKind {
    type Err = UnknownEngagementKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "likes" | "like" => Ok(Self::Like),
            "views" | "view" => Ok(Self::View),
            other => Err(UnknownEngagementKind(other.to_string())),
        }
    }
}

/// A single like or view.
///
/// The task owner is denormalized into the event at emission time so the
/// analytics side never needs to join against the task ledger. The wire
/// field names are `username`, `task_id` and `task_author`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngagementEvent {
    #[serde(rename = "username")]
    pub actor: Username,
    pub task_id: TaskId,
    #[serde(rename = "task_author")]
    pub task_owner: Username,
}

impl EngagementEvent {
    #[must_use]
    pub const fn new(actor: Username, task_id: TaskId, task_owner: Username) -> Self {
        Self {
            actor,
            task_id,
            task_owner,
        }
    }

    /// Builds the synthetic event appended once per kind at task creation.
    #[must_use]
    pub fn bootstrap(task_id: TaskId, task_owner: Username) -> Self {
        Self::new(Username::from_trusted(BOOTSTRAP_ACTOR), task_id, task_owner)
    }

    #[must_use]
    pub fn is_bootstrap(&self) -> bool {
        self.actor.as_str() == BOOTSTRAP_ACTOR
    }
}
