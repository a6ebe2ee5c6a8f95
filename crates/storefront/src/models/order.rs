//! Checkout drafts and persisted orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dvd_shop_core::{Email, OrderDetailId, OrderId, OwnerId, Price, ProductId};

use super::CartItem;

/// Shipping fields collected by the checkout form.
///
/// Missing form fields deserialize as empty and are rejected by
/// [`ShippingDetails::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingDetails {
    pub name: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub phone: String,
}

impl ShippingDetails {
    /// Trim every field and check presence and length.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first field that is missing or too long.
    pub fn normalized(&self) -> Result<Self, String> {
        Ok(Self {
            name: clean_field("name", &self.name, 100)?,
            address: clean_field("address", &self.address, 200)?,
            city: clean_field("city", &self.city, 100)?,
            region: clean_field("region", &self.region, 100)?,
            postal_code: clean_field("postal_code", &self.postal_code, 20)?,
            phone: clean_field("phone", &self.phone, 30)?,
        })
    }
}

fn clean_field(field: &str, value: &str, max: usize) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} is required"));
    }
    if value.chars().count() > max {
        return Err(format!("{field} must be at most {max} characters"));
    }
    Ok(value.to_owned())
}

/// A checkout in progress, held in session state until payment succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub owner: OwnerId,
    pub shipping: ShippingDetails,
    /// Cart total at the moment checkout was submitted.
    pub total: Price,
    pub created_at: DateTime<Utc>,
}

/// Everything the commit sequence needs to persist an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub owner: OwnerId,
    pub shipping: ShippingDetails,
    pub email: Email,
    /// Gateway reference of the successful charge.
    pub charge_id: String,
    pub total: Price,
    pub created_at: DateTime<Utc>,
    /// Cart rows copied verbatim into order details.
    pub lines: Vec<CartItem>,
}

/// A persisted order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: OwnerId,
    pub shipping: ShippingDetails,
    pub email: Email,
    pub charge_id: String,
    pub total: Price,
    pub created_at: DateTime<Utc>,
}

/// A persisted order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    pub id: OrderDetailId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price copied from the cart row, not re-read from the catalog.
    pub price: Price,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            name: " Ada Lovelace ".into(),
            address: "12 St James's Square".into(),
            city: "London".into(),
            region: "Greater London".into(),
            postal_code: "SW1Y 4JH".into(),
            phone: "+44 20 7946 0000".into(),
        }
    }

    #[test]
    fn test_normalized_trims_fields() {
        let cleaned = shipping().normalized();
        assert_eq!(cleaned.map(|s| s.name), Ok("Ada Lovelace".to_string()));
    }

    #[test]
    fn test_normalized_rejects_blank_field() {
        let mut form = shipping();
        form.city = "   ".into();
        assert_eq!(form.normalized(), Err("city is required".to_string()));
    }

    #[test]
    fn test_normalized_rejects_long_field() {
        let mut form = shipping();
        form.postal_code = "9".repeat(21);
        assert_eq!(
            form.normalized(),
            Err("postal_code must be at most 20 characters".to_string())
        );
    }
}
