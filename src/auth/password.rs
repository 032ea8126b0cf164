use anyhow::Context;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::error::{AppError, AppResult, FieldErrors};

const MIN_PASSWORD_LEN: usize = 8;

/// Records a "too short" message under `field` for passwords below the minimum.
pub fn check_length(password: &str, field: &str, errs: &mut FieldErrors) {
    errs.check(
        password.chars().count() >= MIN_PASSWORD_LEN,
        field,
        "Password too short",
    );
}

/// PHC-formatted argon2id hash, ready for `users.password_hash`.
pub fn hash_password(plain: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .context("hash password")
        .map_err(AppError::Internal)
}

/// `Ok(false)` on mismatch. A stored hash that does not parse is a server
/// fault, not a failed login.
pub fn verify_password(plain: &str, stored: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .context("stored password hash is unreadable")?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unreadable_hash_is_an_internal_error() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut errs = FieldErrors::new();
        check_length("ééééééé", "password", &mut errs);
        assert!(errs.finish().is_err());

        let mut errs = FieldErrors::new();
        check_length("éééééééé", "password", &mut errs);
        assert!(errs.finish().is_ok());
    }
}
