//! Catalog queries.

use async_trait::async_trait;

use dvd_shop_core::{CategoryId, Price, ProductId};

use super::PgStore;
use crate::db::{CatalogRepository, RepositoryError};
use crate::models::{Category, Product};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Price,
    category_id: CategoryId,
    description: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            category_id: row.category_id,
            description: row.description,
        }
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name FROM shop.categories ORDER BY name",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT p.id, p.name, p.price, p.category_id, p.description
            FROM shop.products p
            JOIN shop.categories c ON c.id = p.category_id
            WHERE c.name = $1
            ORDER BY p.name
            ",
        )
        .bind(category)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn product_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, category_id, description
            FROM shop.products
            WHERE name = $1
            ",
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Product::from))
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, category_id, description
            FROM shop.products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Product::from))
    }
}

/// Catalog maintenance used by the CLI seeder.
impl PgStore {
    /// Insert a category, or return the existing one with that name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO shop.categories (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            ",
        )
        .bind(name)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    /// Insert a product, or update price, category and description of the
    /// existing product with that name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_product(
        &self,
        name: &str,
        price: Price,
        category_id: CategoryId,
        description: Option<&str>,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO shop.products (name, price, category_id, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
            SET price = EXCLUDED.price,
                category_id = EXCLUDED.category_id,
                description = EXCLUDED.description
            RETURNING id, name, price, category_id, description
            ",
        )
        .bind(name)
        .bind(price)
        .bind(category_id)
        .bind(description)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }
}
