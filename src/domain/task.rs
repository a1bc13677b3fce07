//! Task record value objects.
//!
//! A task moves through exactly three states:
//!
//! ```text
//! nonexistent --create--> active --update--> active --delete--> nonexistent
//! ```
//!
//! There is no archived or soft-deleted state. The id and the owner are fixed
//! at creation; only the [`TaskContent`] changes on update.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Username;

/// Largest page a single `ListPage` call may request.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Identifier of a task, assigned from a strictly increasing counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse().map(Self)
    }
}

/// The mutable part of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContent {
    pub title: String,
    pub description: String,
    /// Free-form status text chosen by the owner.
    pub status: String,
}

impl TaskContent {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            status: status.into(),
        }
    }
}

/// A task record as held by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner: Username,
    pub content: TaskContent,
}

impl Task {
    #[must_use]
    pub const fn new(id: TaskId, owner: Username, content: TaskContent) -> Self {
        Self { id, owner, content }
    }

    /// Returns true if `username` owns this task.
    #[must_use]
    pub fn is_owned_by(&self, username: &Username) -> bool {
        &self.owner == username
    }
}

/// One page of tasks ordered by ascending id.
///
/// `actual_count` is the number of rows actually returned, which is smaller
/// than the requested page size at the end of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub actual_count: usize,
}

impl TaskPage {
    #[must_use]
    pub fn new(tasks: Vec<Task>) -> Self {
        let actual_count = tasks.len();
        Self {
            tasks,
            actual_count,
        }
    }
}
