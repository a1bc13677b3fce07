//! Task ledger: ownership-scoped CRUD over the task store.
//!
//! Ids come from a process-wide atomic counter seeded from the store's
//! high-water mark, the highest id ever handed to an insert. A value is
//! consumed by every `create` call, including calls whose insert then fails;
//! such an id is reported back in [`LedgerError::InsertFailed`] and never
//! reused, not even after a restart that follows deleting the newest task.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use thiserror::Error;

use crate::domain::{MAX_PAGE_SIZE, Task, TaskContent, TaskId, TaskPage, Username};
use crate::infrastructure::{MutationOutcome, StoreError, TaskStore};

/// Errors raised by the task ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No task with this id is owned by the caller (or none exists at all).
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("failed to insert task {task_id}: {source}")]
    InsertFailed { task_id: TaskId, source: StoreError },

    #[error("page size {requested} exceeds the maximum of {MAX_PAGE_SIZE}")]
    PageTooLarge { requested: u32 },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Ownership-scoped task operations.
#[derive(Clone)]
pub struct TaskLedger {
    store: Arc<dyn TaskStore>,
    counter: Arc<AtomicI64>,
}

impl std::fmt::Debug for TaskLedger {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TaskLedger")
            .field("store", &"Arc<dyn TaskStore>")
            .field("counter", &self.counter.load(Ordering::Relaxed))
            .finish()
    }
}

impl TaskLedger {
    /// Creates a ledger whose first id is one past `last_id`.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>, last_id: Option<TaskId>) -> Self {
        let start = last_id.map_or(0, TaskId::value);
        Self {
            store,
            counter: Arc::new(AtomicI64::new(start)),
        }
    }

    /// Creates a ledger seeded from the highest id `store` has ever seen.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be queried.
    pub async fn seeded(store: Arc<dyn TaskStore>) -> Result<Self, StoreError> {
        let last_id = store.highest_task_id().await?;
        tracing::info!(last_task_id = ?last_id.map(TaskId::value), "task id counter seeded");
        Ok(Self::new(store, last_id))
    }

    fn next_id(&self) -> TaskId {
        TaskId::new(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Stores a new task owned by `owner` and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsertFailed`] carrying the consumed id.
    pub async fn create(&self, owner: &Username, content: TaskContent) -> Result<TaskId, LedgerError> {
        let task_id = self.next_id();
        let task = Task::new(task_id, owner.clone(), content);
        self.store
            .insert(&task)
            .await
            .map_err(|source| LedgerError::InsertFailed { task_id, source })?;
        tracing::debug!(%task_id, %owner, "created task");
        Ok(task_id)
    }

    /// Replaces the content of a task owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] both for a missing task and for a
    /// task owned by someone else.
    pub async fn update(
        &self,
        task_id: TaskId,
        owner: &Username,
        content: TaskContent,
    ) -> Result<(), LedgerError> {
        match self.store.update_owned(task_id, owner, &content).await? {
            MutationOutcome::Applied => Ok(()),
            MutationOutcome::Missing => Err(LedgerError::NotFound(task_id)),
        }
    }

    /// Physically deletes a task owned by `owner`.
    ///
    /// # Errors
    ///
    /// Same as [`TaskLedger::update`].
    pub async fn delete(&self, task_id: TaskId, owner: &Username) -> Result<(), LedgerError> {
        match self.store.delete_owned(task_id, owner).await? {
            MutationOutcome::Applied => {
                tracing::debug!(%task_id, %owner, "deleted task");
                Ok(())
            }
            MutationOutcome::Missing => Err(LedgerError::NotFound(task_id)),
        }
    }

    /// Looks a task up by id, without any ownership restriction.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] if no such task exists.
    pub async fn get_by_id(&self, task_id: TaskId) -> Result<Task, LedgerError> {
        self.store
            .find_by_id(task_id)
            .await?
            .ok_or(LedgerError::NotFound(task_id))
    }

    /// Returns up to `page_size` tasks ordered by id, skipping `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PageTooLarge`] above [`MAX_PAGE_SIZE`].
    pub async fn list_page(&self, offset: u64, page_size: u32) -> Result<TaskPage, LedgerError> {
        if page_size > MAX_PAGE_SIZE {
            return Err(LedgerError::PageTooLarge {
                requested: page_size,
            });
        }
        if page_size == 0 {
            return Ok(TaskPage::new(Vec::new()));
        }
        let tasks = self.store.list_page(offset, page_size).await?;
        Ok(TaskPage::new(tasks))
    }
}
