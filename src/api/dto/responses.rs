//! Response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::{
    EngagementKind, Task, TaskId, TaskLeaderboardEntry, TaskPage, TaskStatistics,
    UserLeaderboardEntry, Username,
};

/// Returned by `POST /authenticate` and `POST /register`.
///
/// The same token is also set as the `token` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub username: Username,
    pub token: String,
}

/// Returned by `POST /tasks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreatedResponse {
    pub task_id: TaskId,
}

/// A task as rendered to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: TaskId,
    pub owner: Username,
    pub title: String,
    pub description: String,
    pub status: String,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.id,
            owner: task.owner,
            title: task.content.title,
            description: task.content.description,
            status: task.content.status,
        }
    }
}

/// Returned by `GET /tasks/page`; `page_size` is the number of tasks returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPageResponse {
    pub tasks: Vec<TaskResponse>,
    pub page_size: usize,
}

impl From<TaskPage> for TaskPageResponse {
    fn from(page: TaskPage) -> Self {
        Self {
            page_size: page.actual_count,
            tasks: page.tasks.into_iter().map(TaskResponse::from).collect(),
        }
    }
}

/// Returned by `GET /tasks/{task_id}/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsResponse {
    pub task_id: TaskId,
    pub likes: u64,
    pub views: u64,
}

impl StatisticsResponse {
    #[must_use]
    pub const fn new(task_id: TaskId, statistics: TaskStatistics) -> Self {
        Self {
            task_id,
            likes: statistics.likes,
            views: statistics.views,
        }
    }
}

/// One row of `GET /top/tasks/{kind}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopTaskResponse {
    pub task_id: TaskId,
    pub author: Username,
    pub likes: u64,
    pub views: u64,
}

impl From<TaskLeaderboardEntry> for TopTaskResponse {
    fn from(entry: TaskLeaderboardEntry) -> Self {
        Self {
            task_id: entry.task_id,
            author: entry.author,
            likes: entry.statistics.likes,
            views: entry.statistics.views,
        }
    }
}

/// Returned by `GET /top/tasks/{kind}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopTasksResponse {
    pub kind: EngagementKind,
    pub tasks: Vec<TopTaskResponse>,
}

/// Returned by `GET /top/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUsersResponse {
    pub users: Vec<UserLeaderboardEntry>,
}
