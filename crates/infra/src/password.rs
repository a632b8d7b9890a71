//! Argon2id implementation of the password hashing contract.

use argon2::password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher as _, PasswordVerifier};

use custodia_platform::{PasswordHashError, PasswordHasher};

/// Hashes with default Argon2id parameters and a random salt per password.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2PasswordHasher;

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordHashError(format!("failed to hash password: {e}")))
    }

    fn verify(&self, password: &str, encoded: &str) -> Result<bool, PasswordHashError> {
        let parsed = PasswordHash::new(encoded)
            .map_err(|e| PasswordHashError(format!("invalid password hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordHashError(format!("password verification error: {e}"))),
        }
    }
}
