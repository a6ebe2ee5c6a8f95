//! Local username/password authentication.
//!
//! Passwords are stored as Argon2id PHC strings. A signed-in username also
//! becomes the cart owner identity for the session.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::{AccountRepository, RepositoryError};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Username length bounds.
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 64;

/// Authentication service.
pub struct AuthService<'a> {
    accounts: &'a dyn AccountRepository,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(accounts: &'a dyn AccountRepository) -> Self {
        Self { accounts }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` if the username format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the username is taken.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        validate_username(username)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .accounts
            .create_user(username, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let Some((user, password_hash)) = self.accounts.password_hash(username).await? else {
            warn!("Login for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        Ok(user)
    }
}

/// Validate username format: 3-64 characters of `[A-Za-z0-9_.-]`.
fn validate_username(username: &str) -> Result<(), AuthError> {
    let len = username.len();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(AuthError::InvalidUsername(format!(
            "must be {MIN_USERNAME_LENGTH}-{MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AuthError::InvalidUsername(
            "may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }
    // Guest carts are keyed by UUID; usernames share that key space.
    if Uuid::parse_str(username).is_ok() {
        return Err(AuthError::InvalidUsername("must not be a UUID".to_string()));
    }
    Ok(())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dvd_shop_core::OwnerId;

    use super::*;
    use crate::db::memory::MemoryStore;

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let user = auth.register("film.buff", "correct horse").await.unwrap();
        let again = auth.login("film.buff", "correct horse").await.unwrap();
        assert_eq!(user, again);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register("film.buff", "correct horse").await.unwrap();

        assert!(matches!(
            auth.login("film.buff", "wrong horse").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody", "correct horse").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register("film.buff", "correct horse").await.unwrap();
        assert!(matches!(
            auth.register("film.buff", "another pass").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("jo_e-1.x").is_ok());
        assert!(validate_username("550e8400-e29b-41d4-a716-446655440000").is_err());
        assert!(validate_username(&OwnerId::guest().to_string()).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash).is_ok());
        assert!(verify_password("hunter23", &hash).is_err());
    }
}
