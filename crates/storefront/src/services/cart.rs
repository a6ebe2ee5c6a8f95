//! Cart store operations.
//!
//! Every operation is scoped by an [`OwnerId`]. Carts for different owners
//! never see each other's rows.

use tracing::{debug, instrument};

use dvd_shop_core::{CartItemId, OwnerId, Price, ProductId};

use crate::db::{RepositoryError, ShopStore};
use crate::models::{CartItem, CartLine, CartSummary};

use super::ShopError;
use super::catalog::CatalogService;

/// Largest quantity accepted by a single add.
pub const MAX_ADD_QUANTITY: i32 = 99;

/// Largest quantity a single cart line may reach.
pub const MAX_LINE_QUANTITY: i32 = 999;

/// Cart operations over the shared store.
pub struct CartService<'a> {
    store: &'a dyn ShopStore,
}

impl<'a> CartService<'a> {
    /// Create a cart service.
    #[must_use]
    pub const fn new(store: &'a dyn ShopStore) -> Self {
        Self { store }
    }

    /// Add `quantity` units of a product to the owner's cart.
    ///
    /// Creates the line with the current catalog price on first add and
    /// increments it afterwards. The price stays at the first snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Validation` for an out-of-range quantity.
    /// Returns `ShopError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn add(
        &self,
        owner: &OwnerId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem, ShopError> {
        if !(1..=MAX_ADD_QUANTITY).contains(&quantity) {
            return Err(ShopError::Validation(format!(
                "quantity must be between 1 and {MAX_ADD_QUANTITY}"
            )));
        }

        let product = CatalogService::new(self.store).product_by_id(product_id).await?;

        if let Some(existing) = self.store.find_cart_item(owner, product.id).await? {
            return self.increment(&existing, quantity).await;
        }

        match self
            .store
            .insert_cart_item(owner, product.id, quantity, product.price)
            .await
        {
            Ok(item) => {
                debug!(cart_item_id = %item.id, "Cart line created");
                Ok(item)
            }
            // A concurrent add won the insert; fold into its row.
            Err(RepositoryError::Conflict(_)) => {
                let existing = self
                    .store
                    .find_cart_item(owner, product.id)
                    .await?
                    .ok_or(RepositoryError::NotFound)?;
                self.increment(&existing, quantity).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn increment(&self, existing: &CartItem, quantity: i32) -> Result<CartItem, ShopError> {
        if existing.quantity.saturating_add(quantity) > MAX_LINE_QUANTITY {
            return Err(ShopError::Validation(format!(
                "a cart line cannot exceed {MAX_LINE_QUANTITY} units"
            )));
        }
        let item = self.store.increment_cart_item(existing.id, quantity).await?;
        debug!(cart_item_id = %item.id, quantity = item.quantity, "Cart line incremented");
        Ok(item)
    }

    /// The owner's cart lines in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Persistence` if the store fails.
    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<CartLine>, ShopError> {
        Ok(self.store.cart_lines(owner).await?)
    }

    /// The owner's cart lines with item count and total.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Persistence` if the store fails.
    pub async fn summary(&self, owner: &OwnerId) -> Result<CartSummary, ShopError> {
        Ok(CartSummary::from_lines(self.list(owner).await?))
    }

    /// Sum of `quantity × price` over the owner's raw cart rows.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Persistence` if the store fails.
    pub async fn total(&self, owner: &OwnerId) -> Result<(Price, Vec<CartItem>), ShopError> {
        let items = self.store.cart_items(owner).await?;
        let total = items.iter().map(CartItem::line_total).sum();
        Ok((total, items))
    }

    /// Remove one of the owner's lines.
    ///
    /// Unknown IDs and IDs owned by someone else are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Persistence` if the store fails.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn remove(&self, owner: &OwnerId, id: CartItemId) -> Result<bool, ShopError> {
        let removed = self.store.delete_cart_item(owner, id).await?;
        if !removed {
            debug!(cart_item_id = %id, "Nothing to remove");
        }
        Ok(removed)
    }

    /// Re-key every line of `from` onto `to`.
    ///
    /// Lines that fold together never exceed [`MAX_LINE_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Persistence` if the store fails; nothing moves.
    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub async fn merge_into(&self, from: &OwnerId, to: &OwnerId) -> Result<u64, ShopError> {
        if from == to {
            return Ok(0);
        }
        let moved = self.store.merge_carts(from, to, MAX_LINE_QUANTITY).await?;
        debug!(moved, "Guest cart merged");
        Ok(moved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    async fn store_with_two_films() -> (MemoryStore, ProductId, ProductId) {
        let store = MemoryStore::new();
        let drama = store.add_category("Drama").await;
        let a = store.add_product("Casablanca", 999, drama.id).await;
        let b = store.add_product("Vertigo", 1999, drama.id).await;
        (store, a.id, b.id)
    }

    #[tokio::test]
    async fn test_repeat_add_merges_and_keeps_first_price() {
        let (store, a, _) = store_with_two_films().await;
        let owner = OwnerId::guest();
        let cart = CartService::new(&store);

        cart.add(&owner, a, 1).await.unwrap();
        store.set_price(a, 1299).await;
        let item = cart.add(&owner, a, 2).await.unwrap();

        assert_eq!(item.quantity, 3);
        assert_eq!(item.price, Price::from_cents(999));
        assert_eq!(cart.list(&owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_carts_are_partitioned_by_owner() {
        let (store, a, b) = store_with_two_films().await;
        let cart = CartService::new(&store);
        let alice = OwnerId::parse("alice").unwrap();
        let guest = OwnerId::guest();

        cart.add(&alice, a, 1).await.unwrap();
        cart.add(&guest, b, 4).await.unwrap();

        let lines = cart.list(&alice).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_name, "Casablanca");
        assert_eq!(cart.summary(&guest).await.unwrap().item_count, 4);
    }

    #[tokio::test]
    async fn test_example_cart_total() {
        let (store, a, b) = store_with_two_films().await;
        let cart = CartService::new(&store);
        let owner = OwnerId::guest();
        cart.add(&owner, a, 2).await.unwrap();
        cart.add(&owner, b, 1).await.unwrap();

        let (total, items) = cart.total(&owner).await.unwrap();
        assert_eq!(total, Price::from_cents(3997));
        assert_eq!(items.len(), 2);
        assert_eq!(cart.summary(&owner).await.unwrap().total, total);
    }

    #[tokio::test]
    async fn test_quantity_bounds() {
        let (store, a, _) = store_with_two_films().await;
        let cart = CartService::new(&store);
        let owner = OwnerId::guest();

        for bad in [0, -1, MAX_ADD_QUANTITY + 1] {
            assert!(matches!(
                cart.add(&owner, a, bad).await,
                Err(ShopError::Validation(_))
            ));
        }
        for _ in 0..10 {
            cart.add(&owner, a, MAX_ADD_QUANTITY).await.unwrap();
        }
        assert!(matches!(
            cart.add(&owner, a, MAX_ADD_QUANTITY).await,
            Err(ShopError::Validation(_))
        ));
        assert_eq!(cart.summary(&owner).await.unwrap().item_count, 990);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let (store, _, _) = store_with_two_films().await;
        let cart = CartService::new(&store);
        assert!(matches!(
            cart.add(&OwnerId::guest(), ProductId::new(404), 1).await,
            Err(ShopError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_is_owner_scoped_and_idempotent() {
        let (store, a, _) = store_with_two_films().await;
        let cart = CartService::new(&store);
        let owner = OwnerId::guest();
        let other = OwnerId::guest();
        let item = cart.add(&owner, a, 1).await.unwrap();

        assert!(!cart.remove(&other, item.id).await.unwrap());
        assert!(!cart.remove(&owner, CartItemId::new(9999)).await.unwrap());
        assert_eq!(cart.list(&owner).await.unwrap().len(), 1);

        assert!(cart.remove(&owner, item.id).await.unwrap());
        assert!(cart.list(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_into_self_is_noop() {
        let (store, a, _) = store_with_two_films().await;
        let cart = CartService::new(&store);
        let owner = OwnerId::guest();
        cart.add(&owner, a, 1).await.unwrap();
        assert_eq!(cart.merge_into(&owner, &owner).await.unwrap(), 0);
        assert_eq!(cart.list(&owner).await.unwrap().len(), 1);
    }
}
