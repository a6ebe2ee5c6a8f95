//! Type-safe price representation using decimal arithmetic.
//!
//! All amounts in the shop are US dollars. Prices are stored with two
//! decimal places (`NUMERIC(10, 2)` in `PostgreSQL`) and converted to integer
//! cents only at the payment gateway boundary.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing or converting a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// The amount does not fit in the gateway's integer cent range.
    #[error("price {0} is out of range")]
    OutOfRange(Decimal),
}

/// A non-negative USD amount.
///
/// ```
/// use dvd_shop_core::Price;
/// use rust_decimal::Decimal;
///
/// let unit = Price::new(Decimal::new(999, 2)).unwrap();
/// assert_eq!(unit.times(2).to_string(), "$19.98");
/// assert_eq!(unit.to_cents().unwrap(), 999);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rounding to cents.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount.round_dp(2)))
    }

    /// Create a price from integer cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether this amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Line total for `quantity` units at this price.
    ///
    /// Non-positive quantities yield zero.
    #[must_use]
    pub fn times(&self, quantity: i32) -> Self {
        if quantity <= 0 {
            return Self::ZERO;
        }
        Self(self.0 * Decimal::from(quantity))
    }

    /// Convert to integer cents for the payment gateway.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::OutOfRange`] if the amount does not fit in an `i64`.
    pub fn to_cents(&self) -> Result<i64, PriceError> {
        (self.0 * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or(PriceError::OutOfRange(self.0))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(cents: u32) -> Price {
        Price::from_cents(cents)
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 2)),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_rounds_to_cents() {
        let p = Price::new(Decimal::new(19_999, 3)).unwrap();
        assert_eq!(p.amount(), Decimal::new(2000, 2));
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [price(999).times(2), price(1999).times(1)].into_iter().sum();
        assert_eq!(total, price(3997));
        assert_eq!(total.to_string(), "$39.97");
    }

    #[test]
    fn test_times_non_positive_is_zero() {
        assert!(price(999).times(0).is_zero());
        assert!(price(999).times(-3).is_zero());
    }

    #[test]
    fn test_to_cents() {
        assert_eq!(price(3997).to_cents().unwrap(), 3997);
        assert_eq!(Price::ZERO.to_cents().unwrap(), 0);
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&price(999)).unwrap();
        assert_eq!(json, "\"9.99\"");
    }
}
