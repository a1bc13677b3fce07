//! Principal (user identity) value objects.
//!
//! A principal is identified by its [`Username`], which is unique and never
//! changes after registration. Profile fields are mutable by the owning
//! principal only, and the password hash is opaque to the domain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of characters accepted in a username.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Validation errors for [`Username`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    /// The username is empty or only whitespace.
    #[error("username must not be empty")]
    Empty,
    /// The username is longer than [`MAX_USERNAME_LENGTH`].
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    TooLong,
    /// The username contains a character outside `[A-Za-z0-9_.-]`.
    #[error("username contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// The unique, immutable identity of a principal.
///
/// Registered usernames are restricted to ASCII letters, digits, `_`, `.`
/// and `-`. Names read back from trusted stores (token claims that passed
/// signature verification, stored documents, event payloads) are wrapped
/// without re-validation, which is how the reserved bootstrap actor can
/// exist without ever being registrable.
///
/// # Examples
///
/// ```rust
/// use taskpulse::domain::Username;
///
/// let alice = Username::parse("alice").unwrap();
/// assert_eq!(alice.as_str(), "alice");
///
/// assert!(Username::parse("").is_err());
/// assert!(Username::parse("bob smith").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Validates and wraps a username supplied by a client.
    ///
    /// # Errors
    ///
    /// Returns [`UsernameError`] if the value is empty, too long, or contains
    /// a character outside the allowed set.
    pub fn parse(value: &str) -> Result<Self, UsernameError> {
        if value.is_empty() {
            return Err(UsernameError::Empty);
        }
        if value.chars().count() > MAX_USERNAME_LENGTH {
            return Err(UsernameError::TooLong);
        }
        if let Some(invalid) = value
            .chars()
            .find(|character| !(character.is_ascii_alphanumeric() || "_.-".contains(*character)))
        {
            return Err(UsernameError::InvalidCharacter(invalid));
        }
        Ok(Self(value.to_string()))
    }

    /// Wraps a name that came from a trusted source without validating it.
    #[must_use]
    pub fn from_trusted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for Username {
    type Err = UsernameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Optional profile fields of a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// A partial profile change requested by the owning principal.
///
/// Absent and empty fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl Profile {
    /// Returns a copy of this profile with every non-empty field of `update` applied.
    #[must_use]
    pub fn merged(&self, update: ProfileUpdate) -> Self {
        fn pick(current: &Option<String>, incoming: Option<String>) -> Option<String> {
            incoming
                .filter(|value| !value.is_empty())
                .or_else(|| current.clone())
        }

        Self {
            first_name: pick(&self.first_name, update.first_name),
            last_name: pick(&self.last_name, update.last_name),
            birthday: pick(&self.birthday, update.birthday),
            email: pick(&self.email, update.email),
            phone_number: pick(&self.phone_number, update.phone_number),
        }
    }
}

/// A registered principal as held by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: Username,
    /// Opaque output of the configured password hasher.
    pub password_hash: String,
    #[serde(default)]
    pub profile: Profile,
}

impl Principal {
    /// Creates a principal with an empty profile.
    #[must_use]
    pub fn new(username: Username, password_hash: String) -> Self {
        Self {
            username,
            password_hash,
            profile: Profile::default(),
        }
    }
}

/// The session document of a principal: the single currently valid token.
///
/// `token` is `None` after logout; any presented token then fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub username: Username,
    pub token: Option<String>,
}
