//! Task record stores.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     task_id BIGINT PRIMARY KEY,
//!     creator_username TEXT NOT NULL,
//!     title TEXT NOT NULL,
//!     description TEXT NOT NULL,
//!     status TEXT NOT NULL
//! );
//! ```
//!
//! Ownership-scoped mutations are a single conditional statement
//! (`... WHERE task_id = $1 AND creator_username = $2`) inside a transaction.
//! Exactly one affected row commits; anything else rolls back and reports
//! [`MutationOutcome::Missing`].
//!
//! Every insert first raises the single-row `task_id_high_water` mark, in its
//! own statement, so the mark survives both a failed insert and a later
//! delete. The id counter is seeded from it at startup.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

use super::{StoreError, StoreFuture};
use crate::domain::{Task, TaskContent, TaskId, Username};

/// Result of an ownership-scoped mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Exactly one row matched `(task_id, owner)` and was changed.
    Applied,
    /// No row matched: the task does not exist or belongs to someone else.
    Missing,
}

/// Relational store of task records.
pub trait TaskStore: Send + Sync {
    /// Inserts a new record; fails with [`StoreError::Duplicate`] on an id clash.
    fn insert(&self, task: &Task) -> StoreFuture<()>;

    fn update_owned(
        &self,
        task_id: TaskId,
        owner: &Username,
        content: &TaskContent,
    ) -> StoreFuture<MutationOutcome>;

    fn delete_owned(&self, task_id: TaskId, owner: &Username) -> StoreFuture<MutationOutcome>;

    fn find_by_id(&self, task_id: TaskId) -> StoreFuture<Option<Task>>;

    /// Returns up to `limit` tasks ordered by ascending id, skipping `offset`.
    fn list_page(&self, offset: u64, limit: u32) -> StoreFuture<Vec<Task>>;

    /// Highest id ever passed to [`TaskStore::insert`], including ids whose
    /// row was later deleted or whose insert failed. Seeds the id counter.
    fn highest_task_id(&self) -> StoreFuture<Option<TaskId>>;
}

// =============================================================================
// PostgreSQL Task Store
// =============================================================================

/// `PostgreSQL` implementation of [`TaskStore`].
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn task_from_row(row: &PgRow) -> Result<Task, sqlx::Error> {
    Ok(Task::new(
        TaskId::new(row.try_get("task_id")?),
        Username::from_trusted(row.try_get::<String, _>("creator_username")?),
        TaskContent::new(
            row.try_get::<String, _>("title")?,
            row.try_get::<String, _>("description")?,
            row.try_get::<String, _>("status")?,
        ),
    ))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(database) if database.is_unique_violation())
}

impl TaskStore for PostgresTaskStore {
    fn insert(&self, task: &Task) -> StoreFuture<()> {
        let pool = self.pool.clone();
        let task = task.clone();
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO task_id_high_water (singleton, last_task_id) VALUES (TRUE, $1) \
                 ON CONFLICT (singleton) DO UPDATE SET last_task_id = \
                 GREATEST(task_id_high_water.last_task_id, EXCLUDED.last_task_id)",
            )
            .bind(task.id.value())
            .execute(&pool)
            .await?;

            sqlx::query(
                "INSERT INTO tasks (task_id, creator_username, title, description, status) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(task.id.value())
            .bind(task.owner.as_str())
            .bind(&task.content.title)
            .bind(&task.content.description)
            .bind(&task.content.status)
            .execute(&pool)
            .await
            .map_err(|error| {
                if is_unique_violation(&error) {
                    StoreError::Duplicate(format!("task {}", task.id))
                } else {
                    StoreError::from(error)
                }
            })?;
            tracing::debug!(task_id = %task.id, "inserted task");
            Ok(())
        })
    }

    fn update_owned(
        &self,
        task_id: TaskId,
        owner: &Username,
        content: &TaskContent,
    ) -> StoreFuture<MutationOutcome> {
        let pool = self.pool.clone();
        let owner = owner.clone();
        let content = content.clone();
        Box::pin(async move {
            let mut transaction = pool.begin().await?;
            let result = sqlx::query(
                "UPDATE tasks SET title = $3, description = $4, status = $5 \
                 WHERE task_id = $1 AND creator_username = $2",
            )
            .bind(task_id.value())
            .bind(owner.as_str())
            .bind(&content.title)
            .bind(&content.description)
            .bind(&content.status)
            .execute(&mut *transaction)
            .await?;

            if result.rows_affected() != 1 {
                transaction.rollback().await?;
                return Ok(MutationOutcome::Missing);
            }
            transaction.commit().await?;
            Ok(MutationOutcome::Applied)
        })
    }

    fn delete_owned(&self, task_id: TaskId, owner: &Username) -> StoreFuture<MutationOutcome> {
        let pool = self.pool.clone();
        let owner = owner.clone();
        Box::pin(async move {
            let mut transaction = pool.begin().await?;
            let result =
                sqlx::query("DELETE FROM tasks WHERE task_id = $1 AND creator_username = $2")
                    .bind(task_id.value())
                    .bind(owner.as_str())
                    .execute(&mut *transaction)
                    .await?;

            if result.rows_affected() != 1 {
                transaction.rollback().await?;
                return Ok(MutationOutcome::Missing);
            }
            transaction.commit().await?;
            Ok(MutationOutcome::Applied)
        })
    }

    fn find_by_id(&self, task_id: TaskId) -> StoreFuture<Option<Task>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT task_id, creator_username, title, description, status \
                 FROM tasks WHERE task_id = $1",
            )
            .bind(task_id.value())
            .fetch_optional(&pool)
            .await?;
            Ok(row.as_ref().map(task_from_row).transpose()?)
        })
    }

    fn list_page(&self, offset: u64, limit: u32) -> StoreFuture<Vec<Task>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let offset = i64::try_from(offset)
                .map_err(|_| StoreError::Database(format!("offset {offset} out of range")))?;
            let rows = sqlx::query(
                "SELECT task_id, creator_username, title, description, status \
                 FROM tasks ORDER BY task_id ASC LIMIT $1 OFFSET $2",
            )
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&pool)
            .await?;
            Ok(rows.iter().map(task_from_row).collect::<Result<_, _>>()?)
        })
    }

    fn highest_task_id(&self) -> StoreFuture<Option<TaskId>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            // Engagement rows cover ids assigned before the mark existed.
            let highest: Option<i64> = sqlx::query_scalar(
                "SELECT GREATEST( \
                     (SELECT last_task_id FROM task_id_high_water), \
                     (SELECT MAX(task_id) FROM tasks), \
                     (SELECT MAX(task_id) FROM engagement_likes), \
                     (SELECT MAX(task_id) FROM engagement_views))",
            )
            .fetch_one(&pool)
            .await?;
            Ok(highest.map(TaskId::new))
        })
    }
}

// =============================================================================
// In-Memory Task Store
// =============================================================================

/// In-memory implementation of [`TaskStore`].
///
/// A single write lock around each mutation gives the same check-and-act
/// atomicity as the row lock taken by the `PostgreSQL` statement.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<BTreeMap<TaskId, Task>>>,
    high_water: Arc<AtomicI64>,
}

impl InMemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for InMemoryTaskStore {
    fn insert(&self, task: &Task) -> StoreFuture<()> {
        let tasks = Arc::clone(&self.tasks);
        let high_water = Arc::clone(&self.high_water);
        let task = task.clone();
        Box::pin(async move {
            high_water.fetch_max(task.id.value(), Ordering::SeqCst);
            let mut guard = tasks.write().await;
            if guard.contains_key(&task.id) {
                return Err(StoreError::Duplicate(format!("task {}", task.id)));
            }
            guard.insert(task.id, task);
            Ok(())
        })
    }

    fn update_owned(
        &self,
        task_id: TaskId,
        owner: &Username,
        content: &TaskContent,
    ) -> StoreFuture<MutationOutcome> {
        let tasks = Arc::clone(&self.tasks);
        let owner = owner.clone();
        let content = content.clone();
        Box::pin(async move {
            let mut guard = tasks.write().await;
            match guard.get_mut(&task_id) {
                Some(task) if task.is_owned_by(&owner) => {
                    task.content = content;
                    Ok(MutationOutcome::Applied)
                }
                _ => Ok(MutationOutcome::Missing),
            }
        })
    }

    fn delete_owned(&self, task_id: TaskId, owner: &Username) -> StoreFuture<MutationOutcome> {
        let tasks = Arc::clone(&self.tasks);
        let owner = owner.clone();
        Box::pin(async move {
            let mut guard = tasks.write().await;
            let owned = guard
                .get(&task_id)
                .is_some_and(|task| task.is_owned_by(&owner));
            if !owned {
                return Ok(MutationOutcome::Missing);
            }
            guard.remove(&task_id);
            Ok(MutationOutcome::Applied)
        })
    }

    fn find_by_id(&self, task_id: TaskId) -> StoreFuture<Option<Task>> {
        let tasks = Arc::clone(&self.tasks);
        Box::pin(async move { Ok(tasks.read().await.get(&task_id).cloned()) })
    }

    fn list_page(&self, offset: u64, limit: u32) -> StoreFuture<Vec<Task>> {
        let tasks = Arc::clone(&self.tasks);
        Box::pin(async move {
            let skip = usize::try_from(offset).unwrap_or(usize::MAX);
            let take = usize::try_from(limit).unwrap_or(usize::MAX);
            Ok(tasks
                .read()
                .await
                .values()
                .skip(skip)
                .take(take)
                .cloned()
                .collect())
        })
    }

    fn highest_task_id(&self) -> StoreFuture<Option<TaskId>> {
        let high_water = self.high_water.load(Ordering::SeqCst);
        Box::pin(async move { Ok((high_water > 0).then(|| TaskId::new(high_water))) })
    }
}
