//! Integration tests for the DVD shop.
//!
//! Flows run the full storefront router in-process over the in-memory store
//! and the scripted payment gateway, carrying the session cookie and the
//! anti-forgery token between requests like a browser would.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dvd-shop-integration-tests
//! ```

use std::sync::Arc;

use axum::http::StatusCode;

use dvd_shop_core::ProductId;
pub use dvd_shop_storefront::test_support::{
    FakeGateway, MemoryStore, TestClient, json_body, test_app,
};

/// Shipping form that passes validation.
pub const SHIPPING_FORM: &str =
    "name=Ada+Lovelace&address=12+St+James%27s+Square&city=London&region=Greater+London&postal_code=SW1Y+4JH&phone=%2B44+20+7946+0000";

/// Payment form with a token the scripted gateway accepts.
pub const PAYMENT_FORM: &str = "email=ada%40example.com&token=tok_visa";

/// A storefront over in-memory adapters with two films in one category.
pub struct Shop {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    /// Priced at 9.99.
    pub casablanca: ProductId,
    /// Priced at 19.99.
    pub vertigo: ProductId,
}

impl Shop {
    /// A shop whose gateway approves every charge.
    pub async fn new() -> Self {
        Self::with_gateway(FakeGateway::approving()).await
    }

    /// A shop over the given gateway.
    pub async fn with_gateway(gateway: FakeGateway) -> Self {
        let store = MemoryStore::new();
        let drama = store.add_category("Drama").await;
        let casablanca = store.add_product("Casablanca", 999, drama.id).await.id;
        let vertigo = store.add_product("Vertigo", 1999, drama.id).await.id;
        Self {
            store: Arc::new(store),
            gateway: Arc::new(gateway),
            casablanca,
            vertigo,
        }
    }

    /// A fresh browser session against this shop.
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient::new(test_app(
            Arc::clone(&self.store),
            Arc::clone(&self.gateway),
        ))
    }
}

/// `POST /shop/addtocart` and assert the redirect.
///
/// # Panics
///
/// Panics if the add is not answered with `303 See Other`.
pub async fn add_to_cart(client: &mut TestClient, product: ProductId, quantity: i32) {
    let response = client
        .post_form(
            "/shop/addtocart",
            &format!("Quantity={quantity}&ProductId={product}"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

/// Register `username` and leave the client signed in.
///
/// # Panics
///
/// Panics if registration is rejected.
pub async fn register(client: &mut TestClient, username: &str) {
    let response = client
        .post_form(
            "/account/register",
            &format!("username={username}&password=correct+horse+battery"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}
