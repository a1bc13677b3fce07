//! Domain layer: pure value types for principals, tasks and engagement.
//!
//! Nothing in this module performs I/O.

pub mod engagement;
pub mod principal;
pub mod statistics;
pub mod task;

pub use engagement::{BOOTSTRAP_ACTOR, EngagementEvent, EngagementKind, UnknownEngagementKind};
pub use principal::{
    MAX_USERNAME_LENGTH, Principal, Profile, ProfileUpdate, SessionRecord, Username,
    UsernameError,
};
pub use statistics::{
    TaskLeaderboardEntry, TaskStatistics, UserLeaderboardEntry, correct_author_likes,
    correct_bootstrap,
};
pub use task::{MAX_PAGE_SIZE, Task, TaskContent, TaskId, TaskPage};
