//! Ed25519 session-token signer.
//!
//! Tokens are EdDSA-signed JWTs produced and checked by `jsonwebtoken`.
//! `ed25519-dalek` owns the key material: generation, PEM parsing and the
//! check that the two halves belong together. Verification needs only the
//! public half of the key pair.

use std::path::Path;

use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading keys or producing a token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("failed to read key file {path}: {message}")]
    KeyFile { path: String, message: String },

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("public key does not belong to the private key")]
    KeyMismatch,

    #[error("failed to encode claims: {0}")]
    Encoding(String),
}

/// Errors raised while verifying a presented token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature does not verify")]
    BadSignature,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            _ => Self::Malformed(error.to_string()),
        }
    }
}

/// Claims carried by a session token.
///
/// `username` is optional on the decoding side so that a validly signed
/// token without it can be reported as a missing claim rather than as a
/// malformed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Unique token id; two tokens issued in the same second still differ.
    #[serde(default)]
    pub jti: String,
    /// Issue time in unix seconds.
    #[serde(default)]
    pub iat: u64,
}

/// Signs and verifies session tokens with an Ed25519 key pair.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TokenSigner")
            .field("verifying_key", &hex::encode(self.verifying_key.as_bytes()))
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Builds a signer around an existing private key.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidPrivateKey`] if the key cannot be
    /// re-encoded as PKCS#8.
    pub fn from_signing_key(signing_key: &SigningKey) -> Result<Self, SigningError> {
        let der = signing_key
            .to_pkcs8_der()
            .map_err(|error| SigningError::InvalidPrivateKey(error.to_string()))?;
        let verifying_key = signing_key.verifying_key();

        // Sessions end by replacement or logout, never by age.
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding_key: EncodingKey::from_ed_der(der.as_bytes()),
            // Ed25519 decoding keys are the raw 32-byte public key.
            decoding_key: DecodingKey::from_ed_der(verifying_key.as_bytes()),
            validation,
            verifying_key,
        })
    }

    /// Generates a fresh key pair from the operating system RNG.
    ///
    /// # Errors
    ///
    /// See [`TokenSigner::from_signing_key`].
    pub fn generate() -> Result<Self, SigningError> {
        Self::from_signing_key(&SigningKey::generate(&mut OsRng))
    }

    /// Loads a PKCS#8 private key and an SPKI public key from PEM text.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] if either key fails to decode or the two keys
    /// do not form a pair.
    pub fn from_pem(private_pem: &str, public_pem: &str) -> Result<Self, SigningError> {
        let signing_key = SigningKey::from_pkcs8_pem(private_pem)
            .map_err(|error| SigningError::InvalidPrivateKey(error.to_string()))?;
        let verifying_key = VerifyingKey::from_public_key_pem(public_pem)
            .map_err(|error| SigningError::InvalidPublicKey(error.to_string()))?;
        if signing_key.verifying_key() != verifying_key {
            return Err(SigningError::KeyMismatch);
        }
        Self::from_signing_key(&signing_key)
    }

    /// Reads both PEM files and delegates to [`TokenSigner::from_pem`].
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::KeyFile`] if a file cannot be read.
    pub fn from_pem_files(private_path: &Path, public_path: &Path) -> Result<Self, SigningError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|error| SigningError::KeyFile {
                path: path.display().to_string(),
                message: error.to_string(),
            })
        };
        Self::from_pem(&read(private_path)?, &read(public_path)?)
    }

    /// Produces a signed compact token for `claims`.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Encoding`] if the claims cannot be serialized
    /// or signed.
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, SigningError> {
        encode(&Header::new(Algorithm::EdDSA), claims, &self.encoding_key)
            .map_err(|error| SigningError::Encoding(error.to_string()))
    }

    /// Checks the signature of `token` and decodes its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::BadSignature`] if the signature fails and
    /// [`TokenError::Malformed`] for every other decoding failure.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}
