//! Per-request shopper context.
//!
//! Resolves the cart owner for the session, binding one on first use: the
//! signed-in username if there is one, otherwise a fresh guest UUID.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::debug;

use dvd_shop_core::OwnerId;

use crate::error::AppError;
use crate::models::{ShopContext, ShopSession};

impl<S> FromRequestParts<S> for ShopSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Self::new)
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))
    }
}

impl<S> FromRequestParts<S> for ShopContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = ShopSession::from_request_parts(parts, state).await?;
        let user = session.current_user().await?;

        let owner = if let Some(owner) = session.owner().await? {
            owner
        } else {
            let owner = match &user {
                Some(user) => OwnerId::parse(&user.username)
                    .map_err(|e| AppError::Internal(format!("bad username in session: {e}")))?,
                None => OwnerId::guest(),
            };
            session.bind_owner(&owner).await?;
            debug!(owner = %owner, "Cart owner bound to session");
            owner
        };

        Ok(Self { owner, user })
    }
}
