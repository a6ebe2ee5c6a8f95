//! Cart row queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dvd_shop_core::{CartItemId, OwnerId, Price, ProductId};

use super::{PgStore, conflict_or_database};
use crate::db::{CartRepository, RepositoryError};
use crate::models::{CartItem, CartLine};

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    owner_id: OwnerId,
    product_id: ProductId,
    quantity: i32,
    price: Price,
    created_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: row.id,
            owner: row.owner_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    #[sqlx(flatten)]
    item: CartItemRow,
    product_name: String,
}

const CART_ITEM_COLUMNS: &str = "id, owner_id, product_id, quantity, price, created_at";

#[async_trait]
impl CartRepository for PgStore {
    async fn find_cart_item(
        &self,
        owner: &OwnerId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM shop.cart_items WHERE owner_id = $1 AND product_id = $2"
        ))
        .bind(owner)
        .bind(product_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(CartItem::from))
    }

    async fn insert_cart_item(
        &self,
        owner: &OwnerId,
        product_id: ProductId,
        quantity: i32,
        price: Price,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            INSERT INTO shop.cart_items (owner_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            RETURNING {CART_ITEM_COLUMNS}
            "
        ))
        .bind(owner)
        .bind(product_id)
        .bind(quantity)
        .bind(price)
        .fetch_one(self.pool())
        .await
        .map_err(|e| conflict_or_database(e, "cart item"))?;

        Ok(row.into())
    }

    async fn increment_cart_item(
        &self,
        id: CartItemId,
        delta: i32,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            UPDATE shop.cart_items
            SET quantity = quantity + $2
            WHERE id = $1
            RETURNING {CART_ITEM_COLUMNS}
            "
        ))
        .bind(id)
        .bind(delta)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn cart_items(&self, owner: &OwnerId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM shop.cart_items WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(CartItem::from).collect())
    }

    async fn cart_lines(&self, owner: &OwnerId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT c.id, c.owner_id, c.product_id, c.quantity, c.price, c.created_at,
                   p.name AS product_name
            FROM shop.cart_items c
            JOIN shop.products p ON p.id = c.product_id
            WHERE c.owner_id = $1
            ORDER BY c.id
            ",
        )
        .bind(owner)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CartLine::new(&row.item.into(), row.product_name))
            .collect())
    }

    async fn delete_cart_item(
        &self,
        owner: &OwnerId,
        id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.cart_items WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn merge_carts(
        &self,
        from: &OwnerId,
        to: &OwnerId,
        max_line: i32,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        // Fold overlapping products into the target's rows, keeping its price and the line cap
        sqlx::query(
            r"
            UPDATE shop.cart_items AS t
            SET quantity = LEAST(t.quantity + f.quantity, $3)
            FROM shop.cart_items AS f
            WHERE f.owner_id = $1 AND t.owner_id = $2 AND t.product_id = f.product_id
            ",
        )
        .bind(from)
        .bind(to)
        .bind(max_line)
        .execute(&mut *tx)
        .await?;

        let folded = sqlx::query(
            r"
            DELETE FROM shop.cart_items AS f
            WHERE f.owner_id = $1
              AND EXISTS (
                  SELECT 1 FROM shop.cart_items AS t
                  WHERE t.owner_id = $2 AND t.product_id = f.product_id
              )
            ",
        )
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;

        let moved = sqlx::query("UPDATE shop.cart_items SET owner_id = $2 WHERE owner_id = $1")
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(folded.rows_affected() + moved.rows_affected())
    }
}
