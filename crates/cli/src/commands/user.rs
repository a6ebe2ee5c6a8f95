//! Storefront account commands.
//!
//! # Usage
//!
//! ```bash
//! dvd-cli user create -u film.buff -p 'correct horse battery'
//! DVD_USER_PASSWORD='correct horse battery' dvd-cli user create -u film.buff
//! ```

use dvd_shop_storefront::db::{self, PgStore};
use dvd_shop_storefront::services::auth::{AuthError, AuthService};
use thiserror::Error;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Account creation was refused.
    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Create a storefront account.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `UserError::Auth` if the username is invalid or taken, or the
/// password is too weak.
pub async fn create_user(username: &str, password: &str) -> Result<i32, UserError> {
    let database_url = super::database_url().map_err(UserError::MissingEnvVar)?;

    tracing::info!("Connecting to storefront database...");
    let store = PgStore::new(db::create_pool(&database_url).await?);

    tracing::info!("Creating user: {username}");
    let user = AuthService::new(&store).register(username, password).await?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(user.id.as_i32())
}
