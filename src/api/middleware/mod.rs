//! Cross-cutting concerns for the API:
//!
//! - Error mapping from application errors to HTTP responses
//! - Session token extraction and validation

pub mod error_handler;
pub mod session;

pub use error_handler::{ApiError, ApiErrorResponse};
pub use session::{AuthenticatedUser, TOKEN_COOKIE, session_token, token_cookie};
