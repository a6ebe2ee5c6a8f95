//! Catalog reader.

use dvd_shop_core::ProductId;

use crate::db::ShopStore;
use crate::models::{Category, Product};

use super::ShopError;

/// Read-only catalog queries.
pub struct CatalogService<'a> {
    store: &'a dyn ShopStore,
}

impl<'a> CatalogService<'a> {
    /// Create a catalog service.
    #[must_use]
    pub const fn new(store: &'a dyn ShopStore) -> Self {
        Self { store }
    }

    /// All categories, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Persistence` if the store fails.
    pub async fn categories(&self) -> Result<Vec<Category>, ShopError> {
        Ok(self.store.list_categories().await?)
    }

    /// Products in the named category, ordered by name.
    ///
    /// An unknown category yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Persistence` if the store fails.
    pub async fn browse(&self, category: &str) -> Result<Vec<Product>, ShopError> {
        Ok(self.store.products_in_category(category).await?)
    }

    /// A product by display name.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if no product has that name.
    pub async fn product(&self, name: &str) -> Result<Product, ShopError> {
        self.store
            .product_by_name(name)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("product '{name}'")))
    }

    /// A product by ID.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if the ID does not resolve.
    pub async fn product_by_id(&self, id: ProductId) -> Result<Product, ShopError> {
        self.store
            .product_by_id(id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("product {id}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    #[tokio::test]
    async fn test_categories_and_browse_are_sorted() {
        let store = MemoryStore::new();
        let scifi = store.add_category("Sci-Fi").await;
        store.add_category("Drama").await;
        store.add_product("Solaris", 1499, scifi.id).await;
        store.add_product("Alien", 999, scifi.id).await;
        let catalog = CatalogService::new(&store);

        let names: Vec<_> = catalog
            .categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Drama", "Sci-Fi"]);

        let titles: Vec<_> = catalog
            .browse("Sci-Fi")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(titles, ["Alien", "Solaris"]);
    }

    #[tokio::test]
    async fn test_unknown_category_is_empty() {
        let store = MemoryStore::new();
        assert!(CatalogService::new(&store).browse("Opera").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_product_lookup() {
        let store = MemoryStore::new();
        let c = store.add_category("Noir").await;
        let p = store.add_product("The Third Man", 1299, c.id).await;
        let catalog = CatalogService::new(&store);

        assert_eq!(catalog.product("The Third Man").await.unwrap(), p);
        assert_eq!(catalog.product_by_id(p.id).await.unwrap(), p);
        assert!(matches!(
            catalog.product("Chinatown").await,
            Err(ShopError::NotFound(_))
        ));
    }
}
