//! Session authority: single-session, server-revocable tokens.
//!
//! A token is valid only while it is byte-for-byte equal to the token
//! recorded for its principal. Issuing a new token replaces the record, so
//! a second login immediately invalidates the first session.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use uuid::Uuid;

use crate::domain::{SessionRecord, Username};
use crate::infrastructure::{
    SessionClaims, SessionStore, SigningError, StoreError, TokenError, TokenSigner,
};

/// Errors raised while issuing or validating session tokens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("failed to sign token: {0}")]
    Signing(#[from] SigningError),

    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("token carries no username claim")]
    MissingClaim,

    #[error("no session is recorded for {0}")]
    PrincipalNotFound(Username),

    #[error("session is no longer current")]
    SessionExpired,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Issues, validates and revokes session tokens.
#[derive(Clone)]
pub struct SessionAuthority {
    signer: Arc<TokenSigner>,
    sessions: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for SessionAuthority {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SessionAuthority")
            .field("signer", &self.signer)
            .field("sessions", &"Arc<dyn SessionStore>")
            .finish()
    }
}

impl SessionAuthority {
    #[must_use]
    pub fn new(signer: Arc<TokenSigner>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { signer, sessions }
    }

    /// Signs a fresh token for `username` and records it as the only current one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Signing`] or [`SessionError::Storage`].
    pub async fn issue_token(&self, username: &Username) -> Result<String, SessionError> {
        let issued_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        let claims = SessionClaims {
            username: Some(username.to_string()),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at,
        };
        let token = self.signer.sign(&claims)?;

        self.sessions
            .put(&SessionRecord {
                username: username.clone(),
                token: Some(token.clone()),
            })
            .await?;
        tracing::debug!(%username, jti = %claims.jti, "issued session token");
        Ok(token)
    }

    /// Resolves a presented token to the principal it names.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidToken`] if the signature or format is wrong
    /// - [`SessionError::MissingClaim`] if there is no `username` claim
    /// - [`SessionError::PrincipalNotFound`] if no session record exists
    /// - [`SessionError::SessionExpired`] if the token is not the current one
    pub async fn validate_token(&self, token: &str) -> Result<Username, SessionError> {
        let claims = self.signer.verify(token)?;
        let username = claims
            .username
            .filter(|username| !username.is_empty())
            .map(Username::from_trusted)
            .ok_or(SessionError::MissingClaim)?;

        let record = self
            .sessions
            .get(&username)
            .await?
            .ok_or_else(|| SessionError::PrincipalNotFound(username.clone()))?;

        if record.token.as_deref() != Some(token) {
            return Err(SessionError::SessionExpired);
        }
        Ok(username)
    }

    /// Clears the recorded token so that every issued token stops validating.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] if the record cannot be written.
    pub async fn revoke(&self, username: &Username) -> Result<(), SessionError> {
        self.sessions
            .put(&SessionRecord {
                username: username.clone(),
                token: None,
            })
            .await?;
        tracing::debug!(%username, "revoked session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemorySessionStore;
    use rstest::{fixture, rstest};

    #[fixture]
    fn authority() -> SessionAuthority {
        SessionAuthority::new(
            Arc::new(TokenSigner::generate().unwrap()),
            Arc::new(InMemorySessionStore::new()),
        )
    }

    fn alice() -> Username {
        Username::parse("alice").unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn issued_token_validates(authority: SessionAuthority) {
        let token = authority.issue_token(&alice()).await.unwrap();

        assert_eq!(authority.validate_token(&token).await.unwrap(), alice());
    }

    #[rstest]
    #[tokio::test]
    async fn token_without_record_is_principal_not_found() {
        let signer = Arc::new(TokenSigner::generate().unwrap());
        let issuing = SessionAuthority::new(Arc::clone(&signer), Arc::new(InMemorySessionStore::new()));
        let validating = SessionAuthority::new(signer, Arc::new(InMemorySessionStore::new()));
        let token = issuing.issue_token(&alice()).await.unwrap();

        let result = validating.validate_token(&token).await;

        assert_eq!(result, Err(SessionError::PrincipalNotFound(alice())));
    }

    #[rstest]
    #[tokio::test]
    async fn revoked_token_is_expired(authority: SessionAuthority) {
        let token = authority.issue_token(&alice()).await.unwrap();

        authority.revoke(&alice()).await.unwrap();

        assert_eq!(
            authority.validate_token(&token).await,
            Err(SessionError::SessionExpired)
        );
    }

    #[rstest]
    #[tokio::test]
    async fn garbage_token_is_invalid(authority: SessionAuthority) {
        let result = authority.validate_token("garbage").await;

        assert!(matches!(result, Err(SessionError::InvalidToken(_))));
    }
}
