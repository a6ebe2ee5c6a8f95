//! User domain types.

use chrono::{DateTime, Utc};

use dvd_shop_core::UserId;

/// A storefront account used by the local authentication provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}
