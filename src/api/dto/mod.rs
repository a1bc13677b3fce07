//! Data Transfer Objects for the API layer.
//!
//! DTOs are kept separate from domain types; conversions are plain `From`
//! impls.

pub mod requests;
pub mod responses;

pub use requests::{CredentialsRequest, LimitQuery, PageQuery, TaskRequest};
pub use responses::{
    StatisticsResponse, TaskCreatedResponse, TaskPageResponse, TaskResponse, TokenResponse,
    TopTaskResponse, TopTasksResponse, TopUsersResponse,
};
