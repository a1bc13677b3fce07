//! Error handling for the API layer.
//!
//! Every application error converts into an [`ApiErrorResponse`], which
//! renders as a JSON body with a machine-readable code:
//!
//! | Condition | HTTP Status | Error Code |
//! |-----------|-------------|------------|
//! | bad credentials, invalid/expired/missing token | 401 | `UNAUTHORIZED` |
//! | unknown task, or task owned by someone else | 404 | `NOT_FOUND` |
//! | malformed body/path/query, duplicate username | 400 | `BAD_REQUEST` |
//! | statistics not bootstrapped yet | 404 | `STATISTICS_NOT_READY` |
//! | store, broker or signing failure | 500 | `INTERNAL_ERROR` |
//!
//! Internal failures are logged here and never echoed to the client.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::{
    AccountError, AggregationError, LedgerError, SessionError, WorkflowError,
};
use crate::domain::TaskId;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

// =============================================================================
// API Error
// =============================================================================

/// API error body.
///
/// # Example JSON
///
/// ```json
/// {
///     "code": "NOT_FOUND",
///     "message": "task 7 not found"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// A machine-readable error code.
    pub code: String,
    /// A human-readable error message.
    pub message: String,
    /// Optional additional error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

// =============================================================================
// API Error Response
// =============================================================================

/// Status code plus [`ApiError`] body.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub error: ApiError,
}

impl ApiErrorResponse {
    #[must_use]
    pub const fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", message))
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ApiError::new("UNAUTHORIZED", message),
        )
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", message))
    }

    /// 404 for a task whose statistics baseline has not been ingested yet.
    #[must_use]
    pub fn statistics_not_ready(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ApiError::new("STATISTICS_NOT_READY", message),
        )
    }

    /// 500 Internal Server Error with a generic message.
    #[must_use]
    pub fn internal_error() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new("INTERNAL_ERROR", INTERNAL_MESSAGE),
        )
    }

    fn internal(error: &impl std::fmt::Display) -> Self {
        tracing::error!(%error, "request failed");
        Self::internal_error()
    }

    /// 500 that still reports the id consumed by a failed create.
    fn internal_for_task(error: &impl std::fmt::Display, task_id: TaskId) -> Self {
        tracing::error!(%error, %task_id, "request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::with_details(
                "INTERNAL_ERROR",
                INTERNAL_MESSAGE,
                serde_json::json!({ "task_id": task_id }),
            ),
        )
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

// =============================================================================
// Application Error Conversions
// =============================================================================

impl From<SessionError> for ApiErrorResponse {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::InvalidToken(_)
            | SessionError::MissingClaim
            | SessionError::PrincipalNotFound(_)
            | SessionError::SessionExpired => Self::unauthorized(error.to_string()),
            SessionError::Signing(_) | SessionError::Storage(_) => Self::internal(&error),
        }
    }
}

impl From<AccountError> for ApiErrorResponse {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::InvalidCredentials(_) | AccountError::UsernameTaken(_) => {
                Self::bad_request(error.to_string())
            }
            AccountError::UnknownPrincipal | AccountError::WrongPassword => {
                Self::unauthorized(error.to_string())
            }
            AccountError::Session(inner) => inner.into(),
            AccountError::Storage(_) => Self::internal(&error),
        }
    }
}

impl From<LedgerError> for ApiErrorResponse {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::NotFound(_) => Self::not_found(error.to_string()),
            LedgerError::PageTooLarge { .. } => Self::bad_request(error.to_string()),
            LedgerError::InsertFailed { task_id, .. } => Self::internal_for_task(&error, task_id),
            LedgerError::Storage(_) => Self::internal(&error),
        }
    }
}

impl From<AggregationError> for ApiErrorResponse {
    fn from(error: AggregationError) -> Self {
        match error {
            AggregationError::NotYetCreated(_) => Self::statistics_not_ready(error.to_string()),
            AggregationError::Storage(_) => Self::internal(&error),
        }
    }
}

impl From<WorkflowError> for ApiErrorResponse {
    fn from(error: WorkflowError) -> Self {
        match error {
            WorkflowError::Ledger(inner) => inner.into(),
            WorkflowError::BootstrapFailed { task_id, .. } => {
                Self::internal_for_task(&error, task_id)
            }
            WorkflowError::Emit(_) => Self::internal(&error),
        }
    }
}

// =============================================================================
// Extractor Rejections
// =============================================================================

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiErrorResponse {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiErrorResponse {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Username;
    use crate::infrastructure::{StoreError, TokenError};
    use rstest::rstest;

    #[rstest]
    #[case(SessionError::SessionExpired, StatusCode::UNAUTHORIZED)]
    #[case(SessionError::MissingClaim, StatusCode::UNAUTHORIZED)]
    #[case(
        SessionError::InvalidToken(TokenError::BadSignature),
        StatusCode::UNAUTHORIZED
    )]
    #[case(
        SessionError::PrincipalNotFound(Username::from_trusted("ghost")),
        StatusCode::UNAUTHORIZED
    )]
    #[case(
        SessionError::Storage(StoreError::Document("down".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    fn session_errors_map_to_status(#[case] error: SessionError, #[case] expected: StatusCode) {
        assert_eq!(ApiErrorResponse::from(error).status, expected);
    }

    #[rstest]
    fn unknown_principal_and_wrong_password_are_indistinguishable() {
        let unknown = ApiErrorResponse::from(AccountError::UnknownPrincipal);
        let wrong = ApiErrorResponse::from(AccountError::WrongPassword);

        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.error, wrong.error);
    }

    #[rstest]
    fn taken_username_is_bad_request() {
        let response =
            ApiErrorResponse::from(AccountError::UsernameTaken(Username::from_trusted("alice")));

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error.code, "BAD_REQUEST");
    }

    #[rstest]
    fn missing_task_is_not_found() {
        let response = ApiErrorResponse::from(LedgerError::NotFound(TaskId::new(7)));

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.error.message, "task 7 not found");
    }

    #[rstest]
    fn unbootstrapped_statistics_have_their_own_code() {
        let response = ApiErrorResponse::from(AggregationError::NotYetCreated(TaskId::new(3)));

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.error.code, "STATISTICS_NOT_READY");
    }

    #[rstest]
    fn storage_failure_does_not_leak_details() {
        let response = ApiErrorResponse::from(LedgerError::Storage(StoreError::Database(
            "password authentication failed for user postgres".to_string(),
        )));

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error.message, INTERNAL_MESSAGE);
    }

    #[rstest]
    fn failed_insert_reports_consumed_task_id() {
        let response = ApiErrorResponse::from(LedgerError::InsertFailed {
            task_id: TaskId::new(42),
            source: StoreError::Database("disk full".to_string()),
        });

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error.message, INTERNAL_MESSAGE);
        assert_eq!(
            response.error.details,
            Some(serde_json::json!({ "task_id": 42 }))
        );
    }

    #[rstest]
    fn workflow_ledger_error_keeps_ledger_mapping() {
        let response =
            ApiErrorResponse::from(WorkflowError::Ledger(LedgerError::NotFound(TaskId::new(1))));

        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
