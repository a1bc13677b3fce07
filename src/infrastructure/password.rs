//! Password hashing.

use sha2::{Digest, Sha256};

const SALT_LENGTH: usize = 16;

/// Hashes and checks principal passwords.
///
/// The stored form is opaque to every caller except the hasher itself.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;

    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// SHA-256 over a random per-principal salt followed by the password.
///
/// Stored as `hex(salt)$hex(digest)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaltedSha256Hasher;

impl SaltedSha256Hasher {
    fn digest(salt: &[u8], password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PasswordHasher for SaltedSha256Hasher {
    fn hash(&self, password: &str) -> String {
        let salt: [u8; SALT_LENGTH] = rand::random();
        format!("{}${}", hex::encode(salt), Self::digest(&salt, password))
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        let Some((salt, expected)) = stored.split_once('$') else {
            return false;
        };
        let Ok(salt) = hex::decode(salt) else {
            return false;
        };
        let actual = Self::digest(&salt, password);

        // compare every byte regardless of where the first mismatch is
        actual.len() == expected.len()
            && actual
                .bytes()
                .zip(expected.bytes())
                .fold(0u8, |difference, (left, right)| difference | (left ^ right))
                == 0
    }
}
