//! Dependency injection container.
//!
//! `AppDependencies` holds the constructed services and is the axum router
//! state. Cloning it is cheap: every service is a handle over `Arc`s.

use std::sync::Arc;

use super::{AppConfig, Backends, PasswordHasher, SaltedSha256Hasher, StoreError, TokenSigner};
use crate::application::{
    AccountService, AggregationReader, EngagementEmitter, SessionAuthority, TaskLedger,
    TaskWorkflows,
};

/// Application dependency container.
#[derive(Clone)]
pub struct AppDependencies {
    config: Arc<AppConfig>,
    sessions: SessionAuthority,
    accounts: AccountService,
    ledger: TaskLedger,
    workflows: TaskWorkflows,
    aggregation: AggregationReader,
}

impl std::fmt::Debug for AppDependencies {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppDependencies")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl AppDependencies {
    /// Wires every service on top of `backends`.
    ///
    /// The task-id counter is seeded from the highest stored id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the task store cannot be queried.
    pub async fn build(
        config: AppConfig,
        backends: &Backends,
        signer: TokenSigner,
    ) -> Result<Self, StoreError> {
        let hasher: Arc<dyn PasswordHasher> = Arc::new(SaltedSha256Hasher);
        let sessions = SessionAuthority::new(Arc::new(signer), Arc::clone(&backends.sessions));
        let accounts = AccountService::new(
            Arc::clone(&backends.credentials),
            hasher,
            sessions.clone(),
        );
        let ledger = TaskLedger::seeded(Arc::clone(&backends.tasks)).await?;
        let emitter =
            EngagementEmitter::new(Arc::clone(&backends.broker), config.publish_retry_delay);
        let workflows = TaskWorkflows::new(ledger.clone(), emitter);
        let aggregation = AggregationReader::new(Arc::clone(&backends.analytics));

        Ok(Self {
            config: Arc::new(config),
            sessions,
            accounts,
            ledger,
            workflows,
            aggregation,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionAuthority {
        &self.sessions
    }

    #[must_use]
    pub const fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    #[must_use]
    pub const fn ledger(&self) -> &TaskLedger {
        &self.ledger
    }

    #[must_use]
    pub const fn workflows(&self) -> &TaskWorkflows {
        &self.workflows
    }

    #[must_use]
    pub const fn aggregation(&self) -> &AggregationReader {
        &self.aggregation
    }
}
