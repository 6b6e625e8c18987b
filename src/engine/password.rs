//! Password hashing and verification.
//!
//! New hashes are Argon2id PHC strings with a fresh random salt each:
//! `$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`. The cost parameters travel
//! with the hash, so verification never depends on the current config.
//!
//! Registries written by older versions of the tool hold unsalted SHA-256 hex
//! digests. Those still verify so existing locks can be opened, but nothing
//! new is ever written in that format.

use crate::config::KdfConfig;
use crate::error::{LatchError, Result};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
const LEGACY_DIGEST_LEN: usize = 64;

/// Hashes and verifies passwords.
#[derive(Debug, Clone)]
pub struct PasswordKdf {
    params: Params,
}

impl PasswordKdf {
    pub fn new(config: &KdfConfig) -> Result<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| LatchError::Config(format!("invalid argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `password` with a new random salt.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| LatchError::Password(e.to_string()))
    }

    /// Check `password` against a stored hash. Unparseable hashes never match.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        if is_legacy_digest(stored) {
            return legacy_matches(password, stored);
        }

        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is not a valid PHC string");
                false
            }
        }
    }
}

/// True for hashes written by older versions (bare SHA-256 hex).
pub fn is_legacy_digest(stored: &str) -> bool {
    stored.len() == LEGACY_DIGEST_LEN && stored.bytes().all(|b| b.is_ascii_hexdigit())
}

fn legacy_matches(password: &str, stored: &str) -> bool {
    let computed = hex::encode(Sha256::digest(password.as_bytes()));
    let stored = stored.to_ascii_lowercase();
    // Compare every byte so timing does not reveal the matching prefix.
    computed
        .bytes()
        .zip(stored.bytes())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
