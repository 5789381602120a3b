//! Password hashing, credential checks and session tokens
//!
//! Passwords are stored as `hex(SHA-256(salt || password))` with a random
//! 16-byte hex salt per user.

use crate::db::models::{NewUser, User};
use crate::db::users;
use crate::validation::UserDraft;
use crate::Result;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{debug, warn};

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Fresh per-user salt
pub fn generate_salt() -> String {
    random_hex(16)
}

/// Opaque session token: 32 random bytes as 64 hex characters
pub fn generate_session_token() -> String {
    random_hex(32)
}

/// Hash with an existing salt
pub fn hash_password_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash with a new salt, returning `(hash, salt)`
pub fn hash_password(password: &str) -> (String, String) {
    let salt = generate_salt();
    (hash_password_with_salt(password, &salt), salt)
}

/// Constant-time comparison against a stored hash
pub fn verify_password(password: &str, stored_hash: &str, salt: &str) -> bool {
    let computed = hash_password_with_salt(password, salt);
    constant_time_eq(computed.as_bytes(), stored_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Turn validated user input into a row ready for insertion
pub fn new_user_from_draft(draft: &UserDraft) -> NewUser {
    let (password_hash, password_salt) = hash_password(&draft.password);
    NewUser {
        name: draft.name.clone(),
        email: draft.email.clone(),
        role: draft.role,
        password_hash,
        password_salt,
    }
}

/// Check an email/password pair
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn authenticate(pool: &SqlitePool, email: &str, password: &str) -> Result<Option<User>> {
    let Some((user, hash, salt)) = users::get_user_credentials(pool, email).await? else {
        debug!("Login attempt for unknown email");
        return Ok(None);
    };

    if verify_password(password, &hash, &salt) {
        debug!("Login succeeded for {}", user.email);
        Ok(Some(user))
    } else {
        warn!("Invalid password for {}", user.email);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use crate::db::models::Role;

    #[test]
    fn test_hash_is_salted() {
        let (h1, s1) = hash_password("Secret123");
        let (h2, s2) = hash_password("Secret123");
        assert_ne!(s1, s2);
        assert_ne!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn test_verify_password() {
        let (hash, salt) = hash_password("admin123");
        assert!(verify_password("admin123", &hash, &salt));
        assert!(!verify_password("admin124", &hash, &salt));
        assert!(!verify_password("admin123", &hash[..10], &salt));
    }

    #[test]
    fn test_session_token_shape() {
        let token = generate_session_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_session_token());
    }

    #[tokio::test]
    async fn test_authenticate_round_trip() {
        let pool = init_memory_database().await.unwrap();
        let draft = UserDraft {
            name: "Jane".into(),
            email: "jane@company.com".into(),
            role: Role::EndUser,
            password: "Password1".into(),
        };
        users::create_user(&pool, &new_user_from_draft(&draft)).await.unwrap();

        let found = authenticate(&pool, "JANE@company.com ", "Password1").await.unwrap();
        assert_eq!(found.map(|u| u.email), Some("jane@company.com".to_string()));
        assert!(authenticate(&pool, "jane@company.com", "password1").await.unwrap().is_none());
        assert!(authenticate(&pool, "nobody@company.com", "Password1").await.unwrap().is_none());
    }
}
