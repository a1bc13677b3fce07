//! Request DTOs.
//!
//! Query strings are parsed into the `*Query` types; bodies into the
//! `*Request` types.

use serde::Deserialize;

use crate::domain::TaskContent;

/// Body of `POST /authenticate` and `POST /register`.
///
/// # Example JSON
///
/// ```json
/// {
///     "username": "alice",
///     "password": "s3cret"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /tasks` and `PUT /tasks/{task_id}`.
///
/// Missing fields default to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
}

impl From<TaskRequest> for TaskContent {
    fn from(request: TaskRequest) -> Self {
        Self::new(request.title, request.description, request.status)
    }
}

/// Query of `GET /tasks/page`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: u64,
    pub page_size: u32,
}

/// Query of the leaderboard endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn task_request_fields_default_to_empty() {
        let request: TaskRequest = serde_json::from_str(r#"{"title":"write docs"}"#).unwrap();

        assert_eq!(
            TaskContent::from(request),
            TaskContent::new("write docs", "", "")
        );
    }

    #[rstest]
    fn page_query_requires_page_size() {
        assert!(serde_json::from_str::<PageQuery>(r#"{"offset":3}"#).is_err());
    }
}
