//! Credential and session document stores.
//!
//! Both stores are keyed by username and hold one JSON document per
//! principal. `put` inserts or fully replaces the document.
//!
//! # Key Design
//!
//! - Credentials: `users:{username}` -> JSON [`Principal`]
//! - Sessions: `tokens:{username}` -> JSON [`SessionRecord`]

use std::collections::HashMap;
use std::sync::Arc;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;

use super::{StoreError, StoreFuture};
use crate::domain::{Principal, SessionRecord, Username};

const USER_KEY_PREFIX: &str = "users:";
const TOKEN_KEY_PREFIX: &str = "tokens:";

fn user_key(username: &Username) -> String {
    format!("{USER_KEY_PREFIX}{username}")
}

fn token_key(username: &Username) -> String {
    format!("{TOKEN_KEY_PREFIX}{username}")
}

// =============================================================================
// Traits
// =============================================================================

/// Per-principal password hash and profile.
pub trait CredentialStore: Send + Sync {
    fn get(&self, username: &Username) -> StoreFuture<Option<Principal>>;

    fn put(&self, principal: &Principal) -> StoreFuture<()>;

    /// Stores `principal` only if no document exists for its username.
    ///
    /// Returns `false` when the username is already taken.
    fn insert_if_absent(&self, principal: &Principal) -> StoreFuture<bool>;
}

/// Per-principal current session token.
pub trait SessionStore: Send + Sync {
    fn get(&self, username: &Username) -> StoreFuture<Option<SessionRecord>>;

    fn put(&self, record: &SessionRecord) -> StoreFuture<()>;
}

// =============================================================================
// In-Memory Implementations
// =============================================================================

/// In-memory [`CredentialStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    principals: Arc<RwLock<HashMap<Username, Principal>>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, username: &Username) -> StoreFuture<Option<Principal>> {
        let principals = Arc::clone(&self.principals);
        let username = username.clone();
        Box::pin(async move { Ok(principals.read().await.get(&username).cloned()) })
    }

    fn put(&self, principal: &Principal) -> StoreFuture<()> {
        let principals = Arc::clone(&self.principals);
        let principal = principal.clone();
        Box::pin(async move {
            principals
                .write()
                .await
                .insert(principal.username.clone(), principal);
            Ok(())
        })
    }

    fn insert_if_absent(&self, principal: &Principal) -> StoreFuture<bool> {
        let principals = Arc::clone(&self.principals);
        let principal = principal.clone();
        Box::pin(async move {
            let mut guard = principals.write().await;
            if guard.contains_key(&principal.username) {
                return Ok(false);
            }
            guard.insert(principal.username.clone(), principal);
            Ok(true)
        })
    }
}

/// In-memory [`SessionStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    records: Arc<RwLock<HashMap<Username, SessionRecord>>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, username: &Username) -> StoreFuture<Option<SessionRecord>> {
        let records = Arc::clone(&self.records);
        let username = username.clone();
        Box::pin(async move { Ok(records.read().await.get(&username).cloned()) })
    }

    fn put(&self, record: &SessionRecord) -> StoreFuture<()> {
        let records = Arc::clone(&self.records);
        let record = record.clone();
        Box::pin(async move {
            records
                .write()
                .await
                .insert(record.username.clone(), record);
            Ok(())
        })
    }
}

// =============================================================================
// Redis Implementations
// =============================================================================

/// Redis [`CredentialStore`].
#[derive(Clone)]
pub struct RedisCredentialStore {
    connection: ConnectionManager,
}

impl RedisCredentialStore {
    #[must_use]
    pub const fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

impl std::fmt::Debug for RedisCredentialStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("RedisCredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore for RedisCredentialStore {
    fn get(&self, username: &Username) -> StoreFuture<Option<Principal>> {
        let mut connection = self.connection.clone();
        let key = user_key(username);
        Box::pin(async move {
            let data: Option<String> = connection.get(&key).await?;
            Ok(data.map(|json| serde_json::from_str(&json)).transpose()?)
        })
    }

    fn put(&self, principal: &Principal) -> StoreFuture<()> {
        let mut connection = self.connection.clone();
        let key = user_key(&principal.username);
        let json = serde_json::to_string(principal);
        Box::pin(async move {
            let json = json?;
            connection.set::<_, _, ()>(&key, json).await?;
            tracing::debug!(%key, "stored principal");
            Ok(())
        })
    }

    fn insert_if_absent(&self, principal: &Principal) -> StoreFuture<bool> {
        let mut connection = self.connection.clone();
        let key = user_key(&principal.username);
        let json = serde_json::to_string(principal);
        Box::pin(async move {
            let json = json?;
            // SET NX replies nil when the key already exists
            let reply: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(json)
                .arg("NX")
                .query_async(&mut connection)
                .await?;
            Ok(reply.is_some())
        })
    }
}

/// Redis [`SessionStore`].
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
}

impl RedisSessionStore {
    #[must_use]
    pub const fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("RedisSessionStore").finish_non_exhaustive()
    }
}

impl SessionStore for RedisSessionStore {
    fn get(&self, username: &Username) -> StoreFuture<Option<SessionRecord>> {
        let mut connection = self.connection.clone();
        let key = token_key(username);
        Box::pin(async move {
            let data: Option<String> = connection.get(&key).await?;
            Ok(data.map(|json| serde_json::from_str(&json)).transpose()?)
        })
    }

    fn put(&self, record: &SessionRecord) -> StoreFuture<()> {
        let mut connection = self.connection.clone();
        let key = token_key(&record.username);
        let json = serde_json::to_string(record);
        Box::pin(async move {
            let json = json?;
            connection.set::<_, _, ()>(&key, json).await?;
            Ok(())
        })
    }
}
