//! API layer: axum handlers over the application services.
//!
//! ```text
//! HTTP Request
//!     │
//!     ▼
//! ┌───────────────┐
//! │  Middleware   │ ── session token → AuthenticatedUser
//! └───────────────┘
//!     │
//!     ▼
//! ┌───────────────┐
//! │   Handlers    │ ── DTO → domain, call one service
//! └───────────────┘
//!     │
//!     ▼
//! ┌───────────────┐
//! │   Services    │ ── application layer
//! └───────────────┘
//!     │
//!     ▼
//! HTTP Response (DTO or ApiErrorResponse)
//! ```

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
