// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing with bcrypt.
//!
//! Hashing and verification are CPU-bound and run on the blocking pool.

use super::AuthError;

/// bcrypt work factor.
pub const BCRYPT_COST: u32 = 10;

/// Hash a plaintext password.
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AuthError::InternalError(format!("hashing task failed: {e}")))?
        .map_err(|e| AuthError::InternalError(format!("bcrypt hash failed: {e}")))
}

/// Compare a plaintext password against a stored hash.
///
/// A corrupt hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await;

    match outcome {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Stored password hash is unreadable");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "Password verification task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_differs_from_plaintext_and_verifies() {
        let hash = hash_password("secret").await.unwrap();
        assert_ne!(hash, "secret");
        assert!(hash.starts_with("$2"));
        assert!(hash.contains("$10$"));

        assert!(verify_password("secret", &hash).await);
        assert!(!verify_password("Secret", &hash).await);
    }

    #[tokio::test]
    async fn hashing_is_salted() {
        let a = hash_password("same").await.unwrap();
        let b = hash_password("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn corrupt_hash_is_a_mismatch() {
        assert!(!verify_password("secret", "not-a-bcrypt-hash").await);
    }
}
