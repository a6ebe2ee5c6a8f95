//! Cart owner identity.
//!
//! Every cart row is partitioned by an owner string: either the signed-in
//! user's username or a random UUID minted for a guest session.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing an [`OwnerId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnerIdError {
    /// The input string is empty.
    #[error("owner id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("owner id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// The identity that owns a cart.
///
/// ```
/// use dvd_shop_core::OwnerId;
///
/// let guest = OwnerId::guest();
/// let user = OwnerId::parse("alice").unwrap();
/// assert_ne!(guest, user);
/// assert_eq!(user.as_str(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Maximum length of an owner identity (matches the column width).
    pub const MAX_LENGTH: usize = 128;

    /// Mint a fresh identity for an anonymous session.
    #[must_use]
    pub fn guest() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse an owner identity (typically a username).
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty or longer than [`Self::MAX_LENGTH`].
    pub fn parse(s: &str) -> Result<Self, OwnerIdError> {
        if s.is_empty() {
            return Err(OwnerIdError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(OwnerIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = OwnerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OwnerId> for String {
    fn from(owner: OwnerId) -> Self {
        owner.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OwnerId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OwnerId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OwnerId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_ids_are_unique() {
        assert_ne!(OwnerId::guest(), OwnerId::guest());
    }

    #[test]
    fn test_parse_rejects_empty_and_long() {
        assert_eq!(OwnerId::parse(""), Err(OwnerIdError::Empty));
        assert!(matches!(
            OwnerId::parse(&"x".repeat(OwnerId::MAX_LENGTH + 1)),
            Err(OwnerIdError::TooLong { .. })
        ));
    }

    #[test]
    fn test_session_roundtrip() {
        let owner = OwnerId::parse("bob").unwrap_or_else(|_| OwnerId::guest());
        let json = serde_json::to_string(&owner).unwrap_or_default();
        assert_eq!(json, "\"bob\"");
        let back: Result<OwnerId, _> = serde_json::from_str(&json);
        assert_eq!(back.ok(), Some(owner));
    }
}
