//! Argon2id password hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hashes and verifies passwords with a fixed Argon2id cost.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, SecurityError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| SecurityError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// PHC string (`$argon2id$...`) with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, SecurityError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| SecurityError::Hash(e.to_string()))
    }

    /// False on mismatch and on a malformed stored hash.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self.argon2().verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {e}");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { params: Params::default() }
    }
}
