//! Task handlers.
//!
//! Every endpoint requires a session. Mutations of a task the caller does
//! not own answer `404`, exactly like a missing task.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::api::dto::{PageQuery, TaskCreatedResponse, TaskPageResponse, TaskRequest, TaskResponse};
use crate::api::middleware::{ApiErrorResponse, AuthenticatedUser};
use crate::domain::TaskId;
use crate::infrastructure::AppDependencies;

/// POST /tasks - Create a task owned by the caller.
///
/// # Response
///
/// - `201 Created` with [`TaskCreatedResponse`]
/// - `500 Internal Server Error` if the statistics baseline could not be
///   published; the body's `details.task_id` names the stored task
pub async fn create_task(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(owner): AuthenticatedUser,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskCreatedResponse>), ApiErrorResponse> {
    let Json(request) = payload?;
    let task_id = dependencies
        .workflows()
        .create_task(&owner, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(TaskCreatedResponse { task_id })))
}

/// GET /tasks/page?offset&page_size - One page of tasks by ascending id.
pub async fn list_tasks(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(_): AuthenticatedUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<TaskPageResponse>, ApiErrorResponse> {
    let Query(query) = query?;
    let page = dependencies
        .ledger()
        .list_page(query.offset, query.page_size)
        .await?;
    Ok(Json(page.into()))
}

/// GET /tasks/{task_id}
pub async fn get_task(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(_): AuthenticatedUser,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> Result<Json<TaskResponse>, ApiErrorResponse> {
    let Path(task_id) = task_id?;
    let task = dependencies.ledger().get_by_id(task_id).await?;
    Ok(Json(task.into()))
}

/// PUT /tasks/{task_id} - Replace the content of a task the caller owns.
pub async fn update_task(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(owner): AuthenticatedUser,
    task_id: Result<Path<TaskId>, PathRejection>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<StatusCode, ApiErrorResponse> {
    let Path(task_id) = task_id?;
    let Json(request) = payload?;
    dependencies
        .ledger()
        .update(task_id, &owner, request.into())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /tasks/{task_id} - Delete a task the caller owns.
pub async fn delete_task(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(owner): AuthenticatedUser,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> Result<StatusCode, ApiErrorResponse> {
    let Path(task_id) = task_id?;
    dependencies.ledger().delete(task_id, &owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /tasks/{task_id}/like
pub async fn like_task(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(actor): AuthenticatedUser,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> Result<StatusCode, ApiErrorResponse> {
    let Path(task_id) = task_id?;
    dependencies.workflows().like_task(&actor, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /tasks/{task_id}/view
pub async fn view_task(
    State(dependencies): State<AppDependencies>,
    AuthenticatedUser(actor): AuthenticatedUser,
    task_id: Result<Path<TaskId>, PathRejection>,
) -> Result<StatusCode, ApiErrorResponse> {
    let Path(task_id) = task_id?;
    dependencies.workflows().view_task(&actor, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
