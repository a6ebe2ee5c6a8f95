//! Cart route handlers.
//!
//! Carts belong to the session's owner identity, so anonymous visitors get
//! a working cart too. Mutations answer with `303 See Other` to the cart view.

use axum::{
    Form, Json,
    extract::{Query, State, rejection::FormRejection, rejection::QueryRejection},
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use dvd_shop_core::{CartItemId, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::CsrfToken;
use crate::models::{CartSummary, ShopContext};
use crate::services::cart::CartService;
use crate::state::AppState;

/// Where cart mutations redirect.
pub const CART_PATH: &str = "/shop/cart";

/// Add to cart form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddToCartForm {
    pub quantity: i32,
    pub product_id: ProductId,
}

/// Query for removing a cart line.
#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub id: CartItemId,
}

/// Cart view: lines, item count, total.
#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: CartSummary,
    pub csrf_token: String,
}

/// Add a product to the session's cart.
#[instrument(skip(state, form), fields(owner = %ctx.owner))]
pub async fn add(
    State(state): State<AppState>,
    ctx: ShopContext,
    form: std::result::Result<Form<AddToCartForm>, FormRejection>,
) -> Result<Redirect> {
    let Form(form) = form?;

    let item = CartService::new(state.store())
        .add(&ctx.owner, form.product_id, form.quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[
            ("product_id", &form.product_id.to_string()),
            ("quantity", &item.quantity.to_string()),
        ]),
    );

    Ok(Redirect::to(CART_PATH))
}

/// Show the session's cart.
#[instrument(skip(state, csrf), fields(owner = %ctx.owner))]
pub async fn show(
    State(state): State<AppState>,
    ctx: ShopContext,
    csrf: CsrfToken,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.store()).summary(&ctx.owner).await?;
    Ok(Json(CartView {
        cart,
        csrf_token: csrf.0,
    }))
}

/// Remove a line from the session's cart.
///
/// Unknown IDs and other owners' lines are ignored.
#[instrument(skip(state, query), fields(owner = %ctx.owner))]
pub async fn remove(
    State(state): State<AppState>,
    ctx: ShopContext,
    query: std::result::Result<Query<RemoveQuery>, QueryRejection>,
) -> Result<Redirect> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    CartService::new(state.store())
        .remove(&ctx.owner, query.id)
        .await?;

    Ok(Redirect::to(CART_PATH))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::{StatusCode, header};

    use crate::test_support::{FakeGateway, MemoryStore, TestClient, test_app};

    async fn client() -> (TestClient, i32, i32) {
        let store = MemoryStore::new();
        let drama = store.add_category("Drama").await;
        let a = store.add_product("Casablanca", 999, drama.id).await;
        let b = store.add_product("Vertigo", 1999, drama.id).await;
        let app = test_app(Arc::new(store), Arc::new(FakeGateway::approving()));
        (TestClient::new(app), a.id.as_i32(), b.id.as_i32())
    }

    #[tokio::test]
    async fn test_add_redirects_and_merges() {
        let (mut client, a, b) = client().await;

        let response = client
            .post_form("/shop/addtocart", &format!("Quantity=1&ProductId={a}"))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/shop/cart");

        client
            .post_form("/shop/addtocart", &format!("Quantity=1&ProductId={a}"))
            .await;
        client
            .post_form("/shop/addtocart", &format!("Quantity=1&ProductId={b}"))
            .await;

        let (status, cart) = client.get_json("/shop/cart").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["lines"].as_array().unwrap().len(), 2);
        assert_eq!(cart["lines"][0]["quantity"], 2);
        assert_eq!(cart["total"], "39.97");
        assert_eq!(cart["item_count"], 3);
        assert!(cart["csrf_token"].is_string());
    }

    #[tokio::test]
    async fn test_token_in_form_field_is_accepted() {
        let (mut client, a, _) = client().await;
        client.get("/shop").await;
        let token: String =
            url::form_urlencoded::byte_serialize(client.token().unwrap().as_bytes()).collect();

        let response = client
            .post_form_without_token(
                "/shop/addtocart",
                &format!("Quantity=2&ProductId={a}&csrf_token={token}"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(client.get_json("/shop/cart").await.1["item_count"], 2);
    }

    #[tokio::test]
    async fn test_missing_token_is_forbidden_and_cart_untouched() {
        let (mut client, a, _) = client().await;
        client.get("/shop").await;

        let response = client
            .post_form_without_token("/shop/addtocart", &format!("Quantity=1&ProductId={a}"))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(client.get_json("/shop/cart").await.1["item_count"], 0);
    }

    #[tokio::test]
    async fn test_bad_form_and_quantity_are_rejected() {
        let (mut client, a, _) = client().await;

        let response = client
            .post_form("/shop/addtocart", "Quantity=lots&ProductId=1")
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = client
            .post_form("/shop/addtocart", &format!("Quantity=0&ProductId={a}"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = client
            .post_form("/shop/addtocart", "Quantity=1&ProductId=4040")
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_remove_unknown_id_is_noop() {
        let (mut client, a, _) = client().await;
        client
            .post_form("/shop/addtocart", &format!("Quantity=1&ProductId={a}"))
            .await;
        let token: String =
            url::form_urlencoded::byte_serialize(client.token().unwrap().as_bytes()).collect();

        let response = client
            .get(&format!("/shop/removefromcart?id=9999&csrf_token={token}"))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(client.get_json("/shop/cart").await.1["item_count"], 1);
    }

    #[tokio::test]
    async fn test_remove_line() {
        let (mut client, a, _) = client().await;
        client
            .post_form("/shop/addtocart", &format!("Quantity=1&ProductId={a}"))
            .await;
        let id = client.get_json("/shop/cart").await.1["lines"][0]["id"]
            .as_i64()
            .unwrap();

        let response = client
            .post_form(&format!("/shop/removefromcart?id={id}"), "")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let (_, cart) = client.get_json("/shop/cart").await;
        assert!(cart["lines"].as_array().unwrap().is_empty());
    }
}
