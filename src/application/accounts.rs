//! Account flows: register, authenticate, update profile, logout.

use std::sync::Arc;

use thiserror::Error;

use super::{SessionAuthority, SessionError};
use crate::domain::{Principal, Profile, ProfileUpdate, Username, UsernameError};
use crate::infrastructure::{CredentialStore, PasswordHasher, StoreError};

const BAD_CREDENTIALS: &str = "invalid username or password";

/// Errors raised by the account flows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Registration input is unusable (empty password, malformed username).
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("username {0} is already taken")]
    UsernameTaken(Username),

    #[error("{BAD_CREDENTIALS}")]
    UnknownPrincipal,

    #[error("{BAD_CREDENTIALS}")]
    WrongPassword,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<UsernameError> for AccountError {
    fn from(error: UsernameError) -> Self {
        Self::InvalidCredentials(error.to_string())
    }
}

/// Principal lifecycle on top of the credential store and the session authority.
#[derive(Clone)]
pub struct AccountService {
    credentials: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    sessions: SessionAuthority,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AccountService")
            .field("credentials", &"Arc<dyn CredentialStore>")
            .field("hasher", &"Arc<dyn PasswordHasher>")
            .field("sessions", &self.sessions)
            .finish()
    }
}

impl AccountService {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        sessions: SessionAuthority,
    ) -> Self {
        Self {
            credentials,
            hasher,
            sessions,
        }
    }

    /// Creates a principal and logs it in.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidCredentials`] for a malformed username
    /// or an empty password, and [`AccountError::UsernameTaken`] if the
    /// username is already registered.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Username, String), AccountError> {
        let username = Username::parse(username)?;
        if password.is_empty() {
            return Err(AccountError::InvalidCredentials(
                "password must not be empty".to_string(),
            ));
        }

        let principal = Principal::new(username.clone(), self.hasher.hash(password));
        if !self.credentials.insert_if_absent(&principal).await? {
            return Err(AccountError::UsernameTaken(username));
        }
        tracing::info!(%username, "registered principal");

        let token = self.sessions.issue_token(&username).await?;
        Ok((username, token))
    }

    /// Checks a password and issues a new token, replacing any previous session.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::UnknownPrincipal`] or
    /// [`AccountError::WrongPassword`]; both render the same message.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Username, String), AccountError> {
        let username = Username::parse(username).map_err(|_| AccountError::UnknownPrincipal)?;
        let principal = self
            .credentials
            .get(&username)
            .await?
            .ok_or(AccountError::UnknownPrincipal)?;

        if !self.hasher.verify(password, &principal.password_hash) {
            tracing::debug!(%username, "password mismatch");
            return Err(AccountError::WrongPassword);
        }

        let token = self.sessions.issue_token(&username).await?;
        Ok((username, token))
    }

    /// Merges the non-empty fields of `update` into the stored profile.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::UnknownPrincipal`] if the principal vanished.
    pub async fn update_profile(
        &self,
        username: &Username,
        update: ProfileUpdate,
    ) -> Result<Profile, AccountError> {
        let principal = self
            .credentials
            .get(username)
            .await?
            .ok_or(AccountError::UnknownPrincipal)?;

        let updated = Principal {
            profile: principal.profile.merged(update),
            ..principal
        };
        self.credentials.put(&updated).await?;
        Ok(updated.profile)
    }

    /// Ends the current session of `username`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Session`] if the session record cannot be cleared.
    pub async fn logout(&self, username: &Username) -> Result<(), AccountError> {
        self.sessions.revoke(username).await?;
        tracing::info!(%username, "logged out");
        Ok(())
    }
}
