//! Aggregation reader: corrected per-task counts and leaderboards.
//!
//! Reads are eventually consistent with the emitter; a freshly created task
//! reports [`AggregationError::NotYetCreated`] until its bootstrap events
//! have been ingested.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{
    EngagementKind, TaskId, TaskLeaderboardEntry, TaskStatistics, UserLeaderboardEntry,
    correct_author_likes, correct_bootstrap,
};
use crate::infrastructure::{AnalyticsStore, StoreError};

/// Errors raised by the aggregation reader.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    /// The task has no bootstrap event (yet).
    #[error("statistics for task {0} are not available yet")]
    NotYetCreated(TaskId),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Read-only statistics over the analytics store.
#[derive(Clone)]
pub struct AggregationReader {
    analytics: Arc<dyn AnalyticsStore>,
}

impl std::fmt::Debug for AggregationReader {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AggregationReader")
            .field("analytics", &"Arc<dyn AnalyticsStore>")
            .finish()
    }
}

impl AggregationReader {
    #[must_use]
    pub fn new(analytics: Arc<dyn AnalyticsStore>) -> Self {
        Self { analytics }
    }

    /// Number of distinct genuine actors that emitted `kind` for `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::NotYetCreated`] when the raw count is zero.
    pub async fn count_for_task(
        &self,
        task_id: TaskId,
        kind: EngagementKind,
    ) -> Result<u64, AggregationError> {
        let raw = self.analytics.count_distinct_actors(kind, task_id).await?;
        correct_bootstrap(raw).ok_or(AggregationError::NotYetCreated(task_id))
    }

    /// Corrected like and view counts of `task_id`.
    ///
    /// # Errors
    ///
    /// Same as [`AggregationReader::count_for_task`], for either kind.
    pub async fn task_statistics(&self, task_id: TaskId) -> Result<TaskStatistics, AggregationError> {
        let mut statistics = TaskStatistics::default();
        for kind in EngagementKind::ALL {
            statistics.set(kind, self.count_for_task(task_id, kind).await?);
        }
        Ok(statistics)
    }

    /// The `limit` tasks with the most distinct actors for `kind`.
    ///
    /// Ties are broken by ascending task id. A kind whose bootstrap event has
    /// not been ingested yet reports zero for that task.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Storage`] on store failure.
    pub async fn top_tasks(
        &self,
        kind: EngagementKind,
        limit: usize,
    ) -> Result<Vec<TaskLeaderboardEntry>, AggregationError> {
        let ranked = self.analytics.top_tasks(kind, limit).await?;
        let mut entries = Vec::with_capacity(ranked.len());
        for task in ranked {
            let mut statistics = TaskStatistics::default();
            for counted in EngagementKind::ALL {
                let count = match self.count_for_task(task.task_id, counted).await {
                    Ok(count) => count,
                    Err(AggregationError::NotYetCreated(_)) => 0,
                    Err(error) => return Err(error),
                };
                statistics.set(counted, count);
            }
            entries.push(TaskLeaderboardEntry {
                task_id: task.task_id,
                author: task.author,
                statistics,
            });
        }
        Ok(entries)
    }

    /// The `limit` authors with the most genuine likes across all their tasks.
    ///
    /// One bootstrap like per task the author created is subtracted. Ties are
    /// broken by ascending username.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Storage`] on store failure.
    pub async fn top_users(&self, limit: usize) -> Result<Vec<UserLeaderboardEntry>, AggregationError> {
        let rows = self.analytics.top_authors_by_likes(limit).await?;
        Ok(rows
            .into_iter()
            .map(|row| UserLeaderboardEntry {
                likes: correct_author_likes(row.like_rows, row.distinct_tasks),
                author: row.author,
            })
            .collect())
    }
}
