//! Statistics handlers: per-task counts and leaderboards.
//!
//! Counts are eventually consistent: a task created a moment ago may
//! answer `404 STATISTICS_NOT_READY` until its baseline has been ingested.

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};

use crate::api::dto::{LimitQuery, StatisticsResponse, TopTasksResponse, TopUsersResponse};
use crate::api::middleware::{ApiErrorResponse, AuthenticatedUser};
use crate::domain::{EngagementKind, TaskId, UnknownEngagementKind};
use crate::infrastructure::AppDependencies;

/// GET /tasks/{task_id}/stats - Distinct likers and viewers of a task.
pub async fn task_statistics(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(_): AuthenticatedUser,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> Result<Json<StatisticsResponse>, ApiErrorResponse> {
    let Path(task_id) = task_id?;
    let statistics = dependencies.aggregation().task_statistics(task_id).await?;
    Ok(Json(StatisticsResponse::new(task_id, statistics)))
}

/// GET /top/tasks/{kind}?limit - Tasks with the most distinct actors for `kind`.
///
/// `kind` is `likes` or `views`; `limit` defaults to `TOP_TASKS_LIMIT`.
pub async fn top_tasks(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(_): AuthenticatedUser,
    kind: Result<Path<String>, PathRejection>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<TopTasksResponse>, ApiErrorResponse> {
    let Path(kind) = kind?;
    let Query(query) = query?;
    let kind: EngagementKind = kind.parse().map_err(|error: UnknownEngagementKind| {
        ApiErrorResponse::bad_request(error.to_string())
    })?;
    let limit = query.limit.unwrap_or(dependencies.config().top_tasks_limit);

    let entries = dependencies.aggregation().top_tasks(kind, limit).await?;
    Ok(Json(TopTasksResponse {
        kind,
        tasks: entries.into_iter().map(Into::into).collect(),
    }))
}

/// GET /top/users?limit - Authors with the most genuine likes.
///
/// `limit` defaults to `TOP_USERS_LIMIT`.
pub async fn top_users(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(_): AuthenticatedUser,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<TopUsersResponse>, ApiErrorResponse> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(dependencies.config().top_users_limit);
    let users = dependencies.aggregation().top_users(limit).await?;
    Ok(Json(TopUsersResponse { users }))
}
