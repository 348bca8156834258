//! Credential hashing and verification using Argon2id.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error as HashError, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Hash a secret into a PHC-format Argon2id string for storage.
pub fn hash_secret(secret: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)?
        .to_string())
}

/// Verify a plaintext secret against a stored PHC-format hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or `Err` if the
/// stored hash is malformed. The comparison inside the verifier is
/// constant-time.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_secret_matches() {
        let hash = hash_secret("hunter2").unwrap();
        assert!(verify_secret("hunter2", &hash).unwrap());
    }

    #[test]
    fn wrong_secret_does_not_match() {
        let hash = hash_secret("hunter2").unwrap();
        assert!(!verify_secret("wrong", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_returns_error() {
        assert!(verify_secret("pw", "not-a-hash").is_err());
    }
}
