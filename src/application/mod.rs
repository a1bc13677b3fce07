//! Application layer.
//!
//! - `session` / `accounts` - session authority and principal lifecycle
//! - `ledger` - ownership-scoped task CRUD
//! - `emitter` - like/view/bootstrap publication with transient retry
//! - `aggregation` - corrected counts and leaderboards
//! - `workflows` - operations spanning the ledger and the emitter

mod accounts;
mod aggregation;
mod emitter;
mod ledger;
mod session;
mod workflows;

pub use accounts::{AccountError, AccountService};
pub use aggregation::{AggregationError, AggregationReader};
pub use emitter::{EmitError, EngagementEmitter, TransientClassifier};
pub use ledger::{LedgerError, TaskLedger};
pub use session::{SessionAuthority, SessionError};
pub use workflows::{TaskWorkflows, WorkflowError};
