//! Order commit and lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dvd_shop_core::{Email, OrderDetailId, OrderId, OwnerId, Price, ProductId};

use super::PgStore;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::{NewOrder, Order, OrderDetail, ShippingDetails};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    owner_id: OwnerId,
    name: String,
    address: String,
    city: String,
    region: String,
    postal_code: String,
    phone: String,
    email: Email,
    charge_id: String,
    total: Price,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            owner: row.owner_id,
            shipping: ShippingDetails {
                name: row.name,
                address: row.address,
                city: row.city,
                region: row.region,
                postal_code: row.postal_code,
                phone: row.phone,
            },
            email: row.email,
            charge_id: row.charge_id,
            total: row.total,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderDetailRow {
    id: OrderDetailId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    price: Price,
}

impl From<OrderDetailRow> for OrderDetail {
    fn from(row: OrderDetailRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price: row.price,
        }
    }
}

const ORDER_COLUMNS: &str = "id, owner_id, name, address, city, region, postal_code, phone, \
                             email, charge_id, total, created_at";

#[async_trait]
impl OrderRepository for PgStore {
    async fn commit_order(
        &self,
        order: NewOrder,
    ) -> Result<(Order, Vec<OrderDetail>), RepositoryError> {
        // Dropping `tx` on any early return rolls everything back
        let mut tx = self.pool().begin().await?;

        let header = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.orders (
                owner_id, name, address, city, region, postal_code, phone,
                email, charge_id, total, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(&order.owner)
        .bind(&order.shipping.name)
        .bind(&order.shipping.address)
        .bind(&order.shipping.city)
        .bind(&order.shipping.region)
        .bind(&order.shipping.postal_code)
        .bind(&order.shipping.phone)
        .bind(&order.email)
        .bind(&order.charge_id)
        .bind(order.total)
        .bind(order.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let mut details = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let detail = sqlx::query_as::<_, OrderDetailRow>(
                r"
                INSERT INTO shop.order_details (order_id, product_id, quantity, price)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, product_id, quantity, price
                ",
            )
            .bind(header.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.price)
            .fetch_one(&mut *tx)
            .await?;
            details.push(OrderDetail::from(detail));
        }

        // Consume only the billed quantities; anything added during the charge stays
        for line in &order.lines {
            sqlx::query(
                "DELETE FROM shop.cart_items WHERE id = $1 AND owner_id = $2 AND quantity <= $3",
            )
            .bind(line.id)
            .bind(&order.owner)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r"
                UPDATE shop.cart_items
                SET quantity = quantity - $3
                WHERE id = $1 AND owner_id = $2
                ",
            )
            .bind(line.id)
            .bind(&order.owner)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok((header.into(), details))
    }

    async fn order_for_owner(
        &self,
        owner: &OwnerId,
        id: OrderId,
    ) -> Result<Option<(Order, Vec<OrderDetail>)>, RepositoryError> {
        let Some(header) = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool())
        .await?
        else {
            return Ok(None);
        };

        let details = sqlx::query_as::<_, OrderDetailRow>(
            r"
            SELECT id, order_id, product_id, quantity, price
            FROM shop.order_details
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        Ok(Some((
            header.into(),
            details.into_iter().map(OrderDetail::from).collect(),
        )))
    }
}
