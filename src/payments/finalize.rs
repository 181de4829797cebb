//! Order Finalizer
//!
//! The single choke point for the pending → paid transition. Each call
//! runs under a per-order lock and a single database transaction, so a
//! duplicate webhook delivery racing a client-driven capture can never
//! decrement inventory twice: the first committer wins, every later
//! attempt hits the idempotency gate and returns the order unchanged.

use std::sync::Arc;

use dashmap::DashMap;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::db::models::{Order, OrderItem, OrderStatus};

use super::PaymentProvider;

#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for FinalizeError {
    fn from(err: sqlx::Error) -> Self {
        FinalizeError::Storage(err.to_string())
    }
}

/// Outcome of a finalize call
#[derive(Debug, Clone)]
pub struct FinalizedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// False when the idempotency gate short-circuited (already paid).
    /// Callers emit the "order became paid" signal only when true.
    pub newly_paid: bool,
}

/// Per-order mutual exclusion table.
///
/// Entries are created on demand and removed again once the last holder
/// is done, so the table only ever contains orders with a finalize call
/// in flight.
#[derive(Default)]
struct OrderLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OrderLocks {
    fn for_order(&self, order_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(order_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the entry unless another caller still holds a handle to it.
    /// The strong count is read under the shard lock, so a concurrent
    /// `for_order` either sees the entry or re-creates it.
    fn release(&self, order_id: &str) {
        self.locks
            .remove_if(order_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[derive(Clone)]
pub struct OrderFinalizer {
    pool: SqlitePool,
    locks: Arc<OrderLocks>,
}

impl OrderFinalizer {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: Arc::new(OrderLocks::default()),
        }
    }

    /// Transition an order to paid, decrement inventory, record the
    /// external transaction id. At most once per order, idempotent on
    /// repeat deliveries.
    ///
    /// All mutations happen inside one transaction: a storage failure at
    /// any step aborts the whole unit and the caller must not acknowledge
    /// success to the provider.
    pub async fn finalize(
        &self,
        order_id: &str,
        provider: PaymentProvider,
        external_txn_id: Option<&str>,
        asserted_amount: Option<i64>,
    ) -> Result<FinalizedOrder, FinalizeError> {
        let lock = self.locks.for_order(order_id);
        let result = {
            let _guard = lock.lock().await;
            self.finalize_locked(order_id, provider, external_txn_id, asserted_amount)
                .await
        };
        drop(lock);
        self.locks.release(order_id);
        result
    }

    async fn finalize_locked(
        &self,
        order_id: &str,
        provider: PaymentProvider,
        external_txn_id: Option<&str>,
        asserted_amount: Option<i64>,
    ) -> Result<FinalizedOrder, FinalizeError> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| FinalizeError::NotFound(format!("Order {order_id} not found")))?;

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ? ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        // Idempotency gate: repeated delivery of a payment confirmation is
        // a documented possibility for both providers and must be a no-op.
        if order.status == OrderStatus::Paid {
            if let Some(txn_id) = external_txn_id {
                if order.external_txn_id.as_deref() != Some(txn_id) {
                    // A different transaction id claiming to pay an already
                    // paid order is a possible double payment. Not blocked,
                    // but it must not pass silently.
                    tracing::warn!(
                        order_id,
                        recorded_txn = ?order.external_txn_id,
                        incoming_txn = txn_id,
                        "Already-paid order received a different transaction id"
                    );
                }
            }
            tracing::info!(order_id, "Order already paid, skipping finalize");
            return Ok(FinalizedOrder {
                order,
                items,
                newly_paid: false,
            });
        }

        // Amount reconciliation is advisory: provider-side rounding or
        // conversion can legitimately produce small deltas.
        if let Some(amount) = asserted_amount {
            if amount != order.amount_total {
                tracing::warn!(
                    order_id,
                    order_total = order.amount_total,
                    asserted = amount,
                    "Asserted payment amount differs from order total"
                );
            }
        }

        let txn_id = match external_txn_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                // Degraded path: tolerated, never silent.
                let placeholder = format!("local-{order_id}");
                tracing::warn!(
                    order_id,
                    placeholder,
                    "Payment confirmation without transaction id, using placeholder"
                );
                placeholder
            }
        };

        for item in items.iter().filter(|i| i.product_id.is_some()) {
            let product_id = item.product_id.as_deref().unwrap_or_default();
            let stock: Option<i64> =
                sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
                    .bind(product_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            let Some(stock) = stock else {
                // The catalog product was removed after checkout. The order
                // must still finalize; skip the missing reference.
                tracing::warn!(
                    order_id,
                    product_id,
                    "Line item references a missing product, skipping stock update"
                );
                continue;
            };

            let new_stock = (stock - item.quantity).max(0);
            if new_stock == 0 {
                sqlx::query("UPDATE products SET stock = 0, is_active = 0 WHERE id = ?")
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;
                tracing::info!(product_id, "Product sold out, deactivated");
            } else {
                sqlx::query("UPDATE products SET stock = ? WHERE id = ?")
                    .bind(new_stock)
                    .bind(product_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        sqlx::query(
            "UPDATE orders SET status = 'paid', payment_provider = ?, external_txn_id = ? \
             WHERE id = ?",
        )
        .bind(provider)
        .bind(&txn_id)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id,
            provider = %provider,
            txn_id,
            amount = order.amount_total,
            "Order finalized"
        );

        let order = Order {
            status: OrderStatus::Paid,
            payment_provider: Some(provider),
            external_txn_id: Some(txn_id),
            ..order
        };

        Ok(FinalizedOrder {
            order,
            items,
            newly_paid: true,
        })
    }
}
