//! HTTP handlers.
//!
//! Each handler extracts and validates the request, calls one application
//! service, and converts the result into a DTO. Extractor rejections are
//! taken as `Result` so that they render through [`ApiErrorResponse`].
//!
//! [`ApiErrorResponse`]: crate::api::middleware::ApiErrorResponse

pub mod accounts;
pub mod statistics;
pub mod tasks;

pub use accounts::{authenticate, logout, register, update_profile};
pub use statistics::{task_statistics, top_tasks, top_users};
pub use tasks::{create_task, delete_task, get_task, like_task, list_tasks, update_task, view_task};
