//! Workflows spanning the ledger and the emitter.

use thiserror::Error;

use super::{EmitError, EngagementEmitter, LedgerError, TaskLedger};
use crate::domain::{TaskContent, TaskId, Username};

/// Errors raised by the cross-service workflows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The task row exists but has no statistics baseline.
    #[error("task {task_id} was stored but its statistics could not be initialised: {source}")]
    BootstrapFailed { task_id: TaskId, source: EmitError },

    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Logs an orphaned task if dropped before [`PendingBootstrap::published`].
///
/// A request timeout cancels `create_task` by dropping its future, which
/// skips any error branch after the insert; this guard still fires then.
#[derive(Debug)]
struct PendingBootstrap<'a> {
    task_id: TaskId,
    owner: &'a Username,
    armed: bool,
}

impl<'a> PendingBootstrap<'a> {
    const fn new(task_id: TaskId, owner: &'a Username) -> Self {
        Self {
            task_id,
            owner,
            armed: true,
        }
    }

    fn published(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingBootstrap<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::error!(
                task_id = %self.task_id,
                owner = %self.owner,
                "orphan task: bootstrap events not published"
            );
        }
    }
}

/// Task creation with bootstrap, and like/view of existing tasks.
#[derive(Debug, Clone)]
pub struct TaskWorkflows {
    ledger: TaskLedger,
    emitter: EngagementEmitter,
}

impl TaskWorkflows {
    #[must_use]
    pub const fn new(ledger: TaskLedger, emitter: EngagementEmitter) -> Self {
        Self { ledger, emitter }
    }

    /// Creates a task, then publishes its bootstrap events.
    ///
    /// The ledger insert is not rolled back if bootstrapping fails; the
    /// orphaned id is logged and reported in the error.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Ledger`] if the insert fails and
    /// [`WorkflowError::BootstrapFailed`] if the bootstrap publish fails.
    pub async fn create_task(
        &self,
        owner: &Username,
        content: TaskContent,
    ) -> Result<TaskId, WorkflowError> {
        let task_id = self.ledger.create(owner, content).await?;
        let pending = PendingBootstrap::new(task_id, owner);
        if let Err(source) = self.emitter.emit_bootstrap(task_id, owner).await {
            tracing::error!(%task_id, error = %source, "bootstrap publish failed");
            return Err(WorkflowError::BootstrapFailed { task_id, source });
        }
        pending.published();
        Ok(task_id)
    }

    /// Records a like of `task_id` by `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Ledger`] with `NotFound` for an unknown task.
    pub async fn like_task(&self, actor: &Username, task_id: TaskId) -> Result<(), WorkflowError> {
        let task = self.ledger.get_by_id(task_id).await?;
        self.emitter.emit_like(actor, task_id, &task.owner).await?;
        Ok(())
    }

    /// Records a view of `task_id` by `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Ledger`] with `NotFound` for an unknown task.
    pub async fn view_task(&self, actor: &Username, task_id: TaskId) -> Result<(), WorkflowError> {
        let task = self.ledger.get_by_id(task_id).await?;
        self.emitter.emit_view(actor, task_id, &task.owner).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{
        BrokerError, DeliveredMessage, EventBroker, InMemoryBroker, InMemoryTaskStore,
        OutboundMessage, StoreFuture,
    };
    use rstest::rstest;
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing_subscriber::fmt::MakeWriter;

    struct DownBroker;

    impl EventBroker for DownBroker {
        fn publish(&self, _topic: &str, _message: &OutboundMessage) -> StoreFuture<(), BrokerError> {
            Box::pin(async { Err(BrokerError::new(None, "connection refused")) })
        }

        fn read_after(
            &self,
            _topic: &str,
            _cursor: Option<&str>,
            _max: usize,
        ) -> StoreFuture<Vec<DeliveredMessage>, BrokerError> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    struct StalledBroker;

    impl EventBroker for StalledBroker {
        fn publish(&self, _topic: &str, _message: &OutboundMessage) -> StoreFuture<(), BrokerError> {
            Box::pin(futures::future::pending())
        }

        fn read_after(
            &self,
            _topic: &str,
            _cursor: Option<&str>,
            _max: usize,
        ) -> StoreFuture<Vec<DeliveredMessage>, BrokerError> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }

        fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
            tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .finish()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn username(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    fn workflows(broker: Arc<dyn EventBroker>) -> (TaskWorkflows, TaskLedger) {
        let ledger = TaskLedger::new(Arc::new(InMemoryTaskStore::new()), None);
        let emitter = EngagementEmitter::new(broker, Duration::from_millis(1));
        (TaskWorkflows::new(ledger.clone(), emitter), ledger)
    }

    #[rstest]
    #[tokio::test]
    async fn create_publishes_bootstrap() {
        let broker = Arc::new(InMemoryBroker::new());
        let (workflows, _) = workflows(broker.clone());

        workflows
            .create_task(&username("alice"), TaskContent::new("t", "d", "s"))
            .await
            .unwrap();

        assert_eq!(broker.message_count("likes").await, 1);
        assert_eq!(broker.message_count("views").await, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_bootstrap_fails_creation_but_keeps_row() {
        let (workflows, ledger) = workflows(Arc::new(DownBroker));

        let result = workflows
            .create_task(&username("alice"), TaskContent::default())
            .await;

        let Err(WorkflowError::BootstrapFailed { task_id, .. }) = result else {
            panic!("expected BootstrapFailed, got {result:?}");
        };
        assert!(ledger.get_by_id(task_id).await.is_ok());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn cancelled_creation_still_logs_orphan() {
        let logs = CapturedLogs::default();
        let _default = tracing::subscriber::set_default(logs.subscriber());
        let (workflows, ledger) = workflows(Arc::new(StalledBroker));

        let result = tokio::time::timeout(
            Duration::from_secs(30),
            workflows.create_task(&username("alice"), TaskContent::default()),
        )
        .await;

        assert!(result.is_err());
        assert!(ledger.get_by_id(TaskId::new(1)).await.is_ok());
        let output = logs.contents();
        assert!(output.contains("orphan task"), "{output}");
        assert!(output.contains("task_id=1"), "{output}");
    }

    #[rstest]
    fn published_bootstrap_logs_nothing() {
        let logs = CapturedLogs::default();
        let owner = username("alice");

        tracing::subscriber::with_default(logs.subscriber(), || {
            PendingBootstrap::new(TaskId::new(5), &owner).published();
        });

        assert!(!logs.contents().contains("orphan task"));
    }

    #[rstest]
    #[tokio::test]
    async fn failed_bootstrap_logs_orphan_once() {
        let logs = CapturedLogs::default();
        let _default = tracing::subscriber::set_default(logs.subscriber());
        let (workflows, _) = workflows(Arc::new(DownBroker));

        let result = workflows
            .create_task(&username("alice"), TaskContent::default())
            .await;

        assert!(matches!(result, Err(WorkflowError::BootstrapFailed { .. })));
        assert_eq!(logs.contents().matches("orphan task").count(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn like_of_unknown_task_is_not_found() {
        let (workflows, _) = workflows(Arc::new(InMemoryBroker::new()));

        let result = workflows.like_task(&username("bob"), TaskId::new(99)).await;

        assert_eq!(
            result,
            Err(WorkflowError::Ledger(LedgerError::NotFound(TaskId::new(99))))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn view_attributes_event_to_task_owner() {
        let broker = Arc::new(InMemoryBroker::new());
        let (workflows, _) = workflows(broker.clone());
        let task_id = workflows
            .create_task(&username("alice"), TaskContent::default())
            .await
            .unwrap();

        workflows.view_task(&username("bob"), task_id).await.unwrap();

        let delivered = broker.read_after("views", Some("1"), 10).await.unwrap();
        let event: crate::domain::EngagementEvent =
            serde_json::from_str(&delivered[0].payload).unwrap();
        assert_eq!(event.actor, username("bob"));
        assert_eq!(event.task_owner, username("alice"));
    }
}
