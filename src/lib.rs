//! # taskpulse
//!
//! A task-tracking service with single-session authentication,
//! ownership-scoped task mutation, and engagement statistics.
//!
//! ## Overview
//!
//! - **Sessions**: Ed25519-signed tokens; issuing a new token for a
//!   principal invalidates every earlier one
//! - **Tasks**: a ledger where only the owner may update or delete a task,
//!   and a non-owner cannot tell someone else's task from a missing one
//! - **Engagement**: likes and views are published to per-kind topics,
//!   ingested into an analytics store, and counted per distinct actor
//! - **Leaderboards**: top tasks per kind and top authors by likes
//!
//! ## Layers
//!
//! - [`domain`]: pure value types
//! - [`application`]: the services
//! - [`infrastructure`]: stores, broker, token signer, configuration, wiring
//! - [`api`]: the axum router
//!
//! Every store has an in-memory implementation, so the whole service runs
//! without `PostgreSQL` or Redis:
//!
//! ```rust,ignore
//! use taskpulse::api::create_router;
//! use taskpulse::infrastructure::{AppConfig, AppDependencies, Backends, TokenSigner};
//!
//! let backends = Backends::in_memory();
//! let dependencies =
//!     AppDependencies::build(AppConfig::default(), &backends, TokenSigner::generate()?).await?;
//! let router = create_router(dependencies);
//! ```

#![forbid(unsafe_code)]

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
