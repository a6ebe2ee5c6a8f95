//! Persistence for the storefront.
//!
//! # Database: `dvd_shop`
//!
//! ## Tables (schema `shop`)
//!
//! - `categories` - Catalog categories
//! - `products` - Catalog products (price, category)
//! - `cart_items` - Session-owned cart rows, unique per (owner, product)
//! - `orders` - Order headers
//! - `order_details` - Order lines with price snapshots
//! - `users` - Local accounts
//!
//! Session rows live in the `tower_sessions` schema managed by
//! `tower-sessions-sqlx-store`.
//!
//! # Ports
//!
//! Services talk to the store through the repository traits below so the
//! `PostgreSQL` adapter ([`PgStore`]) can be swapped for the in-memory one in
//! tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p dvd-shop-cli -- migrate
//! ```

mod postgres;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use dvd_shop_core::{CartItemId, OrderId, OwnerId, Price, ProductId};

use crate::models::{CartItem, CartLine, Category, NewOrder, Order, OrderDetail, Product, User};

pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate cart row or username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Read-only catalog queries.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Products whose category has the given name, ordered by name.
    async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, RepositoryError>;

    /// Look up a product by its display name.
    async fn product_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError>;

    /// Look up a product by ID.
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
}

/// Owner-partitioned cart rows.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The row for (owner, product), if any.
    async fn find_cart_item(
        &self,
        owner: &OwnerId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError>;

    /// Insert a new row.
    ///
    /// Returns [`RepositoryError::Conflict`] if a row for (owner, product)
    /// already exists.
    async fn insert_cart_item(
        &self,
        owner: &OwnerId,
        product_id: ProductId,
        quantity: i32,
        price: Price,
    ) -> Result<CartItem, RepositoryError>;

    /// Atomically add `delta` to a row's quantity.
    ///
    /// Returns [`RepositoryError::NotFound`] if the row no longer exists.
    async fn increment_cart_item(
        &self,
        id: CartItemId,
        delta: i32,
    ) -> Result<CartItem, RepositoryError>;

    /// Raw rows for an owner in insertion order.
    async fn cart_items(&self, owner: &OwnerId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Rows for an owner joined with product names, in insertion order.
    async fn cart_lines(&self, owner: &OwnerId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Delete one of the owner's rows. Returns whether a row was removed.
    async fn delete_cart_item(
        &self,
        owner: &OwnerId,
        id: CartItemId,
    ) -> Result<bool, RepositoryError>;

    /// Move every row from `from` onto `to` in one transaction.
    ///
    /// Rows for a product `to` already holds are folded into the existing row,
    /// whose quantity is capped at `max_line`. Returns the number of rows taken
    /// from `from`.
    async fn merge_carts(
        &self,
        from: &OwnerId,
        to: &OwnerId,
        max_line: i32,
    ) -> Result<u64, RepositoryError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist the order header and its lines, then take the ordered quantities
    /// out of the owner's cart, as one transaction. Rows added or topped up
    /// after the lines were read keep the difference. Nothing is written if
    /// any step fails.
    async fn commit_order(
        &self,
        order: NewOrder,
    ) -> Result<(Order, Vec<OrderDetail>), RepositoryError>;

    /// An order and its lines, only if it belongs to `owner`.
    async fn order_for_owner(
        &self,
        owner: &OwnerId,
        id: OrderId,
    ) -> Result<Option<(Order, Vec<OrderDetail>)>, RepositoryError>;
}

/// Local accounts.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Create an account.
    ///
    /// Returns [`RepositoryError::Conflict`] if the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str)
    -> Result<User, RepositoryError>;

    /// The account and its password hash.
    async fn password_hash(&self, username: &str)
    -> Result<Option<(User, String)>, RepositoryError>;
}

/// Connectivity probe for readiness checks.
#[async_trait]
pub trait HealthRepository: Send + Sync {
    /// Succeeds if the store can serve queries.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Everything the storefront needs from persistence.
pub trait ShopStore:
    CatalogRepository + CartRepository + OrderRepository + AccountRepository + HealthRepository
{
}

impl<T> ShopStore for T where
    T: CatalogRepository
        + CartRepository
        + OrderRepository
        + AccountRepository
        + HealthRepository
{
}

/// Shared handle to the store used by services.
pub type DynStore = Arc<dyn ShopStore>;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
