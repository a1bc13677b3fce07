//! Route configuration.
//!
//! # Routes
//!
//! | Method | Path | Handler | Session |
//! |--------|------|---------|---------|
//! | GET | /health | `health_check` | no |
//! | POST | /register | `register` | no |
//! | POST | /authenticate | `authenticate` | no |
//! | POST | /logout | `logout` | yes |
//! | PUT | /profile | `update_profile` | yes |
//! | POST | /tasks | `create_task` | yes |
//! | GET | /tasks/page | `list_tasks` | yes |
//! | GET | /tasks/{task_id} | `get_task` | yes |
//! | PUT | /tasks/{task_id} | `update_task` | yes |
//! | DELETE | /tasks/{task_id} | `delete_task` | yes |
//! | POST | /tasks/{task_id}/like | `like_task` | yes |
//! | POST | /tasks/{task_id}/view | `view_task` | yes |
//! | GET | /tasks/{task_id}/stats | `task_statistics` | yes |
//! | GET | /top/tasks/{kind} | `top_tasks` | yes |
//! | GET | /top/users | `top_users` | yes |

use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{
    authenticate, create_task, delete_task, get_task, like_task, list_tasks, logout, register,
    task_statistics, top_tasks, top_users, update_profile, update_task, view_task,
};
use crate::infrastructure::AppDependencies;

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(response))
}

/// Creates the router with every route, request tracing, and the
/// per-request deadline from `REQUEST_TIMEOUT_MS`.
pub fn create_router(dependencies: AppDependencies) -> Router {
    let request_timeout = dependencies.config().request_timeout;

    Router::new()
        // Account routes
        .route("/register", post(register))
        .route("/authenticate", post(authenticate))
        .route("/logout", post(logout))
        .route("/profile", put(update_profile))
        // Task routes
        .route("/tasks", post(create_task))
        .route("/tasks/page", get(list_tasks))
        .route(
            "/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{task_id}/like", post(like_task))
        .route("/tasks/{task_id}/view", post(view_task))
        // Statistics routes
        .route("/tasks/{task_id}/stats", get(task_statistics))
        .route("/top/tasks/{kind}", get(top_tasks))
        .route("/top/users", get(top_users))
        // Health check
        .route("/health", get(health_check))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(dependencies)
}
