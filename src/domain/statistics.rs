//! Read-side statistics and the bootstrap correction.
//!
//! Every task has exactly one bootstrap event per kind, and the bootstrap
//! actor is indistinguishable from a real actor inside the stream. So for a
//! task that exists:
//!
//! ```text
//! recorded_distinct_actors(kind) = real_distinct_actors(kind) + 1
//! ```
//!
//! A raw count of zero means the bootstrap event has not landed yet.

use serde::{Deserialize, Serialize};

use super::{EngagementKind, TaskId, Username};

/// Removes the bootstrap event from a raw distinct-actor count.
///
/// Returns `None` when `raw` is zero, i.e. the task has not been
/// bootstrapped (yet).
///
/// ```rust
/// use taskpulse::domain::correct_bootstrap;
///
/// assert_eq!(correct_bootstrap(1), Some(0));
/// assert_eq!(correct_bootstrap(4), Some(3));
/// assert_eq!(correct_bootstrap(0), None);
/// ```
#[must_use]
pub const fn correct_bootstrap(raw: u64) -> Option<u64> {
    raw.checked_sub(1)
}

/// Removes one bootstrap like per task from an author's raw like rows.
///
/// The correction is per task the author ever created, not per like.
#[must_use]
pub const fn correct_author_likes(like_rows: u64, distinct_tasks: u64) -> u64 {
    like_rows.saturating_sub(distinct_tasks)
}

/// Corrected like and view counts of one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub likes: u64,
    pub views: u64,
}

impl TaskStatistics {
    #[must_use]
    pub const fn get(&self, kind: EngagementKind) -> u64 {
        match kind {
            EngagementKind::Like => self.likes,
            EngagementKind::View => self.views,
        }
    }

    pub const fn set(&mut self, kind: EngagementKind, value: u64) {
        match kind {
            EngagementKind::Like => self.likes = value,
            EngagementKind::View => self.views = value,
        }
    }
}

/// A row of the task leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLeaderboardEntry {
    pub task_id: TaskId,
    pub author: Username,
    pub statistics: TaskStatistics,
}

/// A row of the author leaderboard: total corrected likes across all tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLeaderboardEntry {
    pub author: Username,
    pub likes: u64,
}
