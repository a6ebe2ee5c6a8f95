//! Catalog reference data.

use serde::Serialize;

use dvd_shop_core::{CategoryId, Price, ProductId};

/// A product category (e.g. "Drama", "Sci-Fi").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A DVD title offered for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Current catalog price; cart rows snapshot this at add time.
    pub price: Price,
    pub category_id: CategoryId,
    pub description: Option<String>,
}
