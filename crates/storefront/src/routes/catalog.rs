//! Catalog route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::CsrfToken;
use crate::models::{Category, Product};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Category list view.
#[derive(Debug, Serialize)]
pub struct CategoriesView {
    pub categories: Vec<Category>,
    pub csrf_token: String,
}

/// Products in one category.
#[derive(Debug, Serialize)]
pub struct BrowseView {
    pub category: String,
    pub products: Vec<Product>,
    pub csrf_token: String,
}

/// Single product view.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub product: Product,
    pub csrf_token: String,
}

/// Query parameters for `/shop/browse`.
#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    #[serde(default)]
    pub category: String,
}

/// Query parameters for `/shop/productdetails`.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub product: String,
}

/// List categories.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    csrf: CsrfToken,
) -> Result<Json<CategoriesView>> {
    let categories = CatalogService::new(state.store()).categories().await?;
    Ok(Json(CategoriesView {
        categories,
        csrf_token: csrf.0,
    }))
}

/// List the products of a category.
#[instrument(skip(state, csrf))]
pub async fn browse(
    State(state): State<AppState>,
    csrf: CsrfToken,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<BrowseView>> {
    let products = CatalogService::new(state.store())
        .browse(&query.category)
        .await?;
    Ok(Json(BrowseView {
        category: query.category,
        products,
        csrf_token: csrf.0,
    }))
}

/// Show one product by name.
#[instrument(skip(state, csrf))]
pub async fn product_details(
    State(state): State<AppState>,
    csrf: CsrfToken,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductView>> {
    let product = CatalogService::new(state.store())
        .product(&query.product)
        .await?;
    Ok(Json(ProductView {
        product,
        csrf_token: csrf.0,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::test_support::{FakeGateway, MemoryStore, test_app};

    async fn get_json(store: Arc<MemoryStore>, uri: &str) -> (StatusCode, Value) {
        let response = test_app(store, Arc::new(FakeGateway::approving()))
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn seeded() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        let drama = store.add_category("Drama").await;
        store.add_category("Comedy").await;
        store.add_product("Casablanca", 999, drama.id).await;
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_index_lists_categories_with_token() {
        let (status, body) = get_json(seeded().await, "/shop").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["categories"][0]["name"], "Comedy");
        assert_eq!(body["categories"][1]["name"], "Drama");
        assert!(!body["csrf_token"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_browse_unknown_category_is_empty() {
        let (status, body) = get_json(seeded().await, "/shop/browse?category=Opera").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["products"], Value::Array(Vec::new()));
    }

    #[tokio::test]
    async fn test_browse_lists_products() {
        let (_, body) = get_json(seeded().await, "/shop/browse?category=Drama").await;
        assert_eq!(body["products"][0]["name"], "Casablanca");
        assert_eq!(body["products"][0]["price"], "9.99");
    }

    #[tokio::test]
    async fn test_product_details() {
        let (status, body) =
            get_json(seeded().await, "/shop/productdetails?product=Casablanca").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product"]["name"], "Casablanca");

        let (status, body) = get_json(seeded().await, "/shop/productdetails?product=Heat").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("Heat"));
    }
}
