//! In-memory adapter for the repository ports.
//!
//! Backs unit and integration tests. A single async mutex guards all tables,
//! so every trait method is atomic in the same way a `PostgreSQL`
//! transaction is. `fail_commits` injects a failure into `commit_order`
//! after validation but before anything is written.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use dvd_shop_core::{
    CartItemId, CategoryId, OrderDetailId, OrderId, OwnerId, Price, ProductId, UserId,
};

use super::{
    AccountRepository, CartRepository, CatalogRepository, HealthRepository, OrderRepository,
    RepositoryError,
};
use crate::models::{CartItem, CartLine, Category, NewOrder, Order, OrderDetail, Product, User};

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    products: Vec<Product>,
    cart: Vec<CartItem>,
    orders: Vec<Order>,
    details: Vec<OrderDetail>,
    users: Vec<(User, String)>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn product_name(&self, id: ProductId) -> Option<&str> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.as_str())
    }
}

/// Repository implementation held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_commits: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog category.
    pub async fn add_category(&self, name: &str) -> Category {
        let mut t = self.tables.lock().await;
        let category = Category {
            id: CategoryId::new(t.next_id()),
            name: name.to_owned(),
        };
        t.categories.push(category.clone());
        category
    }

    /// Add a catalog product priced in cents.
    pub async fn add_product(&self, name: &str, cents: u32, category_id: CategoryId) -> Product {
        let mut t = self.tables.lock().await;
        let product = Product {
            id: ProductId::new(t.next_id()),
            name: name.to_owned(),
            price: Price::from_cents(cents),
            category_id,
            description: None,
        };
        t.products.push(product.clone());
        product
    }

    /// Change a product's catalog price (cart snapshots must not follow).
    pub async fn set_price(&self, id: ProductId, cents: u32) {
        let mut t = self.tables.lock().await;
        if let Some(p) = t.products.iter_mut().find(|p| p.id == id) {
            p.price = Price::from_cents(cents);
        }
    }

    /// Make subsequent `commit_order` calls fail without writing anything.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Number of persisted order lines.
    pub async fn order_detail_count(&self) -> usize {
        self.tables.lock().await.details.len()
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories = self.tables.lock().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, RepositoryError> {
        let t = self.tables.lock().await;
        let Some(category_id) = t
            .categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.id)
        else {
            return Ok(Vec::new());
        };
        let mut products: Vec<Product> = t
            .products
            .iter()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn product_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.products.iter().find(|p| p.name == name).cloned())
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.products.iter().find(|p| p.id == id).cloned())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find_cart_item(
        &self,
        owner: &OwnerId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.cart
            .iter()
            .find(|c| &c.owner == owner && c.product_id == product_id)
            .cloned())
    }

    async fn insert_cart_item(
        &self,
        owner: &OwnerId,
        product_id: ProductId,
        quantity: i32,
        price: Price,
    ) -> Result<CartItem, RepositoryError> {
        let mut t = self.tables.lock().await;
        if t.cart
            .iter()
            .any(|c| &c.owner == owner && c.product_id == product_id)
        {
            return Err(RepositoryError::Conflict("cart item already exists".into()));
        }
        let item = CartItem {
            id: CartItemId::new(t.next_id()),
            owner: owner.clone(),
            product_id,
            quantity,
            price,
            created_at: Utc::now(),
        };
        t.cart.push(item.clone());
        Ok(item)
    }

    async fn increment_cart_item(
        &self,
        id: CartItemId,
        delta: i32,
    ) -> Result<CartItem, RepositoryError> {
        let mut t = self.tables.lock().await;
        let item = t
            .cart
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        item.quantity += delta;
        Ok(item.clone())
    }

    async fn cart_items(&self, owner: &OwnerId) -> Result<Vec<CartItem>, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.cart.iter().filter(|c| &c.owner == owner).cloned().collect())
    }

    async fn cart_lines(&self, owner: &OwnerId) -> Result<Vec<CartLine>, RepositoryError> {
        let t = self.tables.lock().await;
        t.cart
            .iter()
            .filter(|c| &c.owner == owner)
            .map(|c| {
                let name = t.product_name(c.product_id).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "cart item {} references missing product {}",
                        c.id, c.product_id
                    ))
                })?;
                Ok(CartLine::new(c, name.to_owned()))
            })
            .collect()
    }

    async fn delete_cart_item(
        &self,
        owner: &OwnerId,
        id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock().await;
        let before = t.cart.len();
        t.cart.retain(|c| !(c.id == id && &c.owner == owner));
        Ok(t.cart.len() < before)
    }

    async fn merge_carts(
        &self,
        from: &OwnerId,
        to: &OwnerId,
        max_line: i32,
    ) -> Result<u64, RepositoryError> {
        let mut t = self.tables.lock().await;
        let (incoming, mut rest): (Vec<CartItem>, Vec<CartItem>) =
            std::mem::take(&mut t.cart)
                .into_iter()
                .partition(|c| &c.owner == from);

        let taken = incoming.len() as u64;
        for mut item in incoming {
            if let Some(existing) = rest
                .iter_mut()
                .find(|c| &c.owner == to && c.product_id == item.product_id)
            {
                existing.quantity = existing.quantity.saturating_add(item.quantity).min(max_line);
            } else {
                item.owner = to.clone();
                rest.push(item);
            }
        }
        rest.sort_by_key(|c| c.id);
        t.cart = rest;
        Ok(taken)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn commit_order(
        &self,
        order: NewOrder,
    ) -> Result<(Order, Vec<OrderDetail>), RepositoryError> {
        let mut t = self.tables.lock().await;
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        let header = Order {
            id: OrderId::new(t.next_id()),
            owner: order.owner.clone(),
            shipping: order.shipping,
            email: order.email,
            charge_id: order.charge_id,
            total: order.total,
            created_at: order.created_at,
        };

        let mut details = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            details.push(OrderDetail {
                id: OrderDetailId::new(t.next_id()),
                order_id: header.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
            });
        }

        t.orders.push(header.clone());
        t.details.extend(details.iter().cloned());
        for line in &order.lines {
            if let Some(row) = t
                .cart
                .iter_mut()
                .find(|c| c.id == line.id && c.owner == order.owner)
            {
                row.quantity -= line.quantity;
            }
        }
        t.cart.retain(|c| c.quantity > 0);

        Ok((header, details))
    }

    async fn order_for_owner(
        &self,
        owner: &OwnerId,
        id: OrderId,
    ) -> Result<Option<(Order, Vec<OrderDetail>)>, RepositoryError> {
        let t = self.tables.lock().await;
        let Some(order) = t
            .orders
            .iter()
            .find(|o| o.id == id && &o.owner == owner)
            .cloned()
        else {
            return Ok(None);
        };
        let details = t
            .details
            .iter()
            .filter(|d| d.order_id == id)
            .cloned()
            .collect();
        Ok(Some((order, details)))
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|(u, _)| u.username == username) {
            return Err(RepositoryError::Conflict("username already exists".into()));
        }
        let user = User {
            id: UserId::new(t.next_id()),
            username: username.to_owned(),
            created_at: Utc::now(),
        };
        t.users.push((user.clone(), password_hash.to_owned()));
        Ok(user)
    }

    async fn password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|(u, _)| u.username == username).cloned())
    }
}

#[async_trait]
impl HealthRepository for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dvd_shop_core::Email;

    use super::*;
    use crate::models::ShippingDetails;

    #[tokio::test]
    async fn test_merge_folds_overlapping_products() {
        let store = MemoryStore::new();
        let drama = store.add_category("Drama").await;
        let a = store.add_product("Casablanca", 999, drama.id).await;
        let b = store.add_product("Vertigo", 1499, drama.id).await;

        let guest = OwnerId::guest();
        let alice = OwnerId::parse("alice").unwrap();
        store.insert_cart_item(&alice, a.id, 1, a.price).await.unwrap();
        store.insert_cart_item(&guest, a.id, 2, Price::from_cents(1)).await.unwrap();
        store.insert_cart_item(&guest, b.id, 1, b.price).await.unwrap();

        assert_eq!(store.merge_carts(&guest, &alice, 999).await.unwrap(), 2);

        let items = store.cart_items(&alice).await.unwrap();
        assert_eq!(items.len(), 2);
        let casablanca = items.iter().find(|i| i.product_id == a.id).unwrap();
        assert_eq!(casablanca.quantity, 3);
        assert_eq!(casablanca.price, a.price);
        assert!(store.cart_items(&guest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_caps_folded_line() {
        let store = MemoryStore::new();
        let drama = store.add_category("Drama").await;
        let a = store.add_product("Casablanca", 999, drama.id).await;

        let guest = OwnerId::guest();
        let alice = OwnerId::parse("alice").unwrap();
        store.insert_cart_item(&alice, a.id, 999, a.price).await.unwrap();
        store.insert_cart_item(&guest, a.id, 999, a.price).await.unwrap();

        store.merge_carts(&guest, &alice, 999).await.unwrap();

        let items = store.cart_items(&alice).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 999);
    }

    #[tokio::test]
    async fn test_commit_takes_only_ordered_quantities() {
        let store = MemoryStore::new();
        let drama = store.add_category("Drama").await;
        let a = store.add_product("Casablanca", 999, drama.id).await;
        let b = store.add_product("Vertigo", 1999, drama.id).await;
        let owner = OwnerId::parse("alice").unwrap();

        store.insert_cart_item(&owner, a.id, 2, a.price).await.unwrap();
        let lines = store.cart_items(&owner).await.unwrap();
        let row = lines[0].id;
        store.increment_cart_item(row, 5).await.unwrap();
        store.insert_cart_item(&owner, b.id, 1, b.price).await.unwrap();

        let (_, details) = store
            .commit_order(NewOrder {
                owner: owner.clone(),
                shipping: ShippingDetails::default(),
                email: Email::parse("alice@example.com").unwrap(),
                charge_id: "ch_1".into(),
                total: Price::from_cents(1998),
                created_at: Utc::now(),
                lines,
            })
            .await
            .unwrap();

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].quantity, 2);
        let left = store.cart_items(&owner).await.unwrap();
        assert_eq!(left.len(), 2);
        assert_eq!(left[0].quantity, 5);
        assert_eq!(left[1].product_id, b.id);
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = MemoryStore::new();
        let c = store.add_category("Noir").await;
        let p = store.add_product("The Third Man", 1299, c.id).await;
        let owner = OwnerId::guest();
        store.insert_cart_item(&owner, p.id, 1, p.price).await.unwrap();
        assert!(matches!(
            store.insert_cart_item(&owner, p.id, 1, p.price).await,
            Err(RepositoryError::Conflict(_))
        ));
    }
}
