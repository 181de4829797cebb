//! Order Repository
//!
//! Order creation copies unit prices from the catalog at checkout time;
//! the recorded amounts are authoritative from then on. The paid
//! transition itself lives in the finalizer, not here.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{RepoError, RepoResult};
use crate::db::models::{Order, OrderCreate, OrderItem, Product};

/// Name used for the non-catalog shipping line item
pub const SHIPPING_LINE_NAME: &str = "Shipping";

#[derive(Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find order by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Line items for an order, insertion order
    pub async fn find_items(&self, order_id: &str) -> RepoResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ? ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// List orders, newest first (admin/display)
    pub async fn find_all(&self, limit: i64, offset: i64) -> RepoResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// Create a pending order from catalog selections.
    ///
    /// Unit prices come from the current catalog rows; the total is the
    /// sum of line totals in minor units. Inactive or unknown products
    /// are rejected here — the catalog layer should not have offered them.
    pub async fn create(&self, data: OrderCreate, currency: &str) -> RepoResult<Order> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let mut total: i64 = 0;
        let mut lines: Vec<(String, String, i64, i64)> = Vec::with_capacity(data.items.len());
        for item in &data.items {
            let product =
                sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
                    .bind(&item.product_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| {
                        RepoError::NotFound(format!("Product {} not found", item.product_id))
                    })?;
            if !product.is_active {
                return Err(RepoError::Validation(format!(
                    "Product {} is not available",
                    product.id
                )));
            }
            total += product.price * item.quantity;
            lines.push((product.id, product.name, item.quantity, product.price));
        }

        let shipping = data.shipping.as_ref();
        sqlx::query(
            "INSERT INTO orders \
             (id, status, amount_total, currency, customer_email, \
              ship_name, ship_street, ship_city, ship_postal_code, ship_country, created_at) \
             VALUES (?, 'pending', ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(total)
        .bind(currency)
        .bind(&data.customer_email)
        .bind(shipping.map(|s| s.name.clone()))
        .bind(shipping.map(|s| s.street.clone()))
        .bind(shipping.map(|s| s.city.clone()))
        .bind(shipping.map(|s| s.postal_code.clone()))
        .bind(shipping.map(|s| s.country.clone()))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (product_id, name, quantity, unit_price) in lines {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, name, quantity, unit_price) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(product_id)
            .bind(name)
            .bind(quantity)
            .bind(unit_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// Append the shipping line item, once.
    ///
    /// The append is idempotent: a second call finds the existing shipping
    /// line and leaves order and total untouched. Only pending orders can
    /// gain a shipping line — the total is frozen by the paid transition.
    pub async fn append_shipping(&self, order_id: &str, amount: i64) -> RepoResult<Order> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")))?;

        if order.status != crate::db::models::OrderStatus::Pending {
            return Err(RepoError::Conflict(format!(
                "Order {order_id} is no longer pending"
            )));
        }

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM order_items WHERE order_id = ? AND product_id IS NULL AND name = ?",
        )
        .bind(order_id)
        .bind(SHIPPING_LINE_NAME)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            tracing::debug!(order_id, "Shipping line already present, skipping append");
            drop(tx);
            return self
                .find_by_id(order_id)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")));
        }

        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, name, quantity, unit_price) \
             VALUES (?, NULL, ?, 1, ?)",
        )
        .bind(order_id)
        .bind(SHIPPING_LINE_NAME)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE orders SET amount_total = amount_total + ? WHERE id = ?")
            .bind(amount)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_by_id(order_id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")))
    }
}
