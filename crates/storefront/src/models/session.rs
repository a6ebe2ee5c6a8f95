//! Session-related types.
//!
//! Types stored in the session for identity, anti-forgery and checkout state,
//! and the typed wrapper used to read and write them.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

use dvd_shop_core::{OwnerId, Price, UserId};

use super::OrderDraft;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Username; doubles as the cart owner identity once signed in.
    pub username: String,
}

/// Request-scoped shopper identity.
///
/// Extracted once per request and handed to every service call in place of
/// ambient "current user" lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopContext {
    /// Identity partitioning this session's cart.
    pub owner: OwnerId,
    /// Signed-in user, if any.
    pub user: Option<CurrentUser>,
}

impl ShopContext {
    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the cart owner identity bound to this session.
    pub const CART_OWNER: &str = "cart_owner";

    /// Key for the anti-forgery token.
    pub const CSRF_TOKEN: &str = "csrf_token";

    /// Key for the pending checkout draft.
    pub const ORDER_DRAFT: &str = "order_draft";

    /// Key for the checkout total shown on the payment step.
    pub const CHECKOUT_TOTAL: &str = "checkout_total";
}

/// Typed access to the storefront's session keys.
#[derive(Debug, Clone)]
pub struct ShopSession(Session);

impl ShopSession {
    /// Wrap a session handle.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self(session)
    }

    /// The cart owner bound to this session, if one has been bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails or the value is malformed.
    pub async fn owner(&self) -> Result<Option<OwnerId>, SessionError> {
        self.0.get(keys::CART_OWNER).await
    }

    /// Bind (or rebind) the cart owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn bind_owner(&self, owner: &OwnerId) -> Result<(), SessionError> {
        self.0.insert(keys::CART_OWNER, owner).await
    }

    /// The signed-in user, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails or the value is malformed.
    pub async fn current_user(&self) -> Result<Option<CurrentUser>, SessionError> {
        self.0.get(keys::CURRENT_USER).await
    }

    /// Record a successful sign-in.
    ///
    /// The session ID is rotated to prevent fixation.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn sign_in(&self, user: &CurrentUser) -> Result<(), SessionError> {
        self.0.cycle_id().await?;
        self.0.insert(keys::CURRENT_USER, user).await
    }

    /// The pending checkout draft.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails or the value is malformed.
    pub async fn draft(&self) -> Result<Option<OrderDraft>, SessionError> {
        self.0.get(keys::ORDER_DRAFT).await
    }

    /// Store a checkout draft together with its display total.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn store_draft(&self, draft: &OrderDraft) -> Result<(), SessionError> {
        self.0.insert(keys::ORDER_DRAFT, draft).await?;
        self.0.insert(keys::CHECKOUT_TOTAL, draft.total).await
    }

    /// The total shown on the payment step.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails or the value is malformed.
    pub async fn checkout_total(&self) -> Result<Option<Price>, SessionError> {
        self.0.get(keys::CHECKOUT_TOTAL).await
    }

    /// Drop the draft and its total.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn clear_draft(&self) -> Result<(), SessionError> {
        self.0.remove_value(keys::ORDER_DRAFT).await?;
        self.0.remove_value(keys::CHECKOUT_TOTAL).await?;
        Ok(())
    }

    /// The anti-forgery token, if one has been minted.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn csrf_token(&self) -> Result<Option<String>, SessionError> {
        self.0.get(keys::CSRF_TOKEN).await
    }

    /// Store the anti-forgery token.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn set_csrf_token(&self, token: &str) -> Result<(), SessionError> {
        self.0.insert(keys::CSRF_TOKEN, token).await
    }

    /// Remove everything and delete the session record.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn flush(&self) -> Result<(), SessionError> {
        self.0.flush().await
    }
}
