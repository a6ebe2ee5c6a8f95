//! Cart rows and the owner-scoped cart view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dvd_shop_core::{CartItemId, OwnerId, Price, ProductId};

/// A persisted cart row.
///
/// At most one row exists per (owner, product); repeat adds bump `quantity`
/// and leave the `price` snapshot from the first add untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub owner: OwnerId,
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price captured when the product was first added.
    pub price: Price,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// `quantity × price` for this row.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A cart row joined with product display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Price,
    pub line_total: Price,
}

impl CartLine {
    /// Build a display line from a cart row and the product's name.
    #[must_use]
    pub fn new(item: &CartItem, product_name: String) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name,
            quantity: item.quantity,
            unit_price: item.price,
            line_total: item.line_total(),
        }
    }
}

/// All lines of one owner's cart plus derived totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub item_count: i64,
    pub total: Price,
}

impl CartSummary {
    /// Compute counts and the total from the given lines.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let item_count = lines.iter().map(|l| i64::from(l.quantity.max(0))).sum();
        let total = lines.iter().map(|l| l.line_total).sum();
        Self {
            lines,
            item_count,
            total,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, quantity: i32, cents: u32) -> CartLine {
        let item = CartItem {
            id: CartItemId::new(id),
            owner: OwnerId::guest(),
            product_id: ProductId::new(id),
            quantity,
            price: Price::from_cents(cents),
            created_at: Utc::now(),
        };
        CartLine::new(&item, format!("Film {id}"))
    }

    #[test]
    fn test_summary_totals_match_example_cart() {
        let summary = CartSummary::from_lines(vec![line(1, 2, 999), line(2, 1, 1999)]);
        assert_eq!(summary.total, Price::from_cents(3997));
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.lines[0].line_total, Price::from_cents(1998));
    }

    #[test]
    fn test_empty_summary() {
        let summary = CartSummary::from_lines(Vec::new());
        assert!(summary.is_empty());
        assert!(summary.total.is_zero());
        assert_eq!(summary.item_count, 0);
    }
}
