//! Notification / Invoice Dispatch
//!
//! Fires after a successful finalize: confirmation email and invoice.
//! Every failure in here is logged and swallowed — nothing downstream of
//! the paid transition may roll it back or re-trigger it.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::db::models::{Order, OrderItem};

/// Outbound confirmation-mail collaborator
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_order_confirmation(
        &self,
        order: &Order,
        items: &[OrderItem],
    ) -> anyhow::Result<()>;
}

/// Invoice generation collaborator; layout/rendering is not our concern,
/// only "make an invoice available for this order snapshot".
#[async_trait]
pub trait InvoiceRenderer: Send + Sync {
    async fn generate(&self, order: &Order, items: &[OrderItem]) -> anyhow::Result<()>;
}

/// Dispatcher invoked with the order+items snapshot after commit
#[derive(Clone)]
pub struct NotificationDispatch {
    mailer: Arc<dyn Mailer>,
    invoices: Arc<dyn InvoiceRenderer>,
}

impl NotificationDispatch {
    pub fn new(mailer: Arc<dyn Mailer>, invoices: Arc<dyn InvoiceRenderer>) -> Self {
        Self { mailer, invoices }
    }

    /// Handle the "order became paid" signal. Never returns an error.
    pub async fn order_paid(&self, order: &Order, items: &[OrderItem]) {
        if let Err(e) = self.mailer.send_order_confirmation(order, items).await {
            tracing::error!(order_id = %order.id, error = %e, "Confirmation mail failed");
        }
        if let Err(e) = self.invoices.generate(order, items).await {
            tracing::error!(order_id = %order.id, error = %e, "Invoice generation failed");
        }
    }
}

// =============================================================================
// Default collaborators
// =============================================================================

/// Mailer that only logs; the real SMTP/provider integration sits behind
/// the same trait in deployment.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_order_confirmation(
        &self,
        order: &Order,
        items: &[OrderItem],
    ) -> anyhow::Result<()> {
        tracing::info!(
            order_id = %order.id,
            email = ?order.customer_email,
            item_count = items.len(),
            amount = order.amount_total,
            "Order confirmation mail queued"
        );
        Ok(())
    }
}

/// Writes the invoice data record as JSON under the invoice directory.
/// PDF layout is a downstream concern; this makes the invoice available.
pub struct JsonInvoiceWriter {
    dir: PathBuf,
}

impl JsonInvoiceWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl InvoiceRenderer for JsonInvoiceWriter {
    async fn generate(&self, order: &Order, items: &[OrderItem]) -> anyhow::Result<()> {
        let invoice = json!({
            "order_id": order.id,
            "issued_at": chrono::Utc::now(),
            "currency": order.currency,
            "amount_total": order.amount_total,
            "payment_provider": order.payment_provider,
            "external_txn_id": order.external_txn_id,
            "customer_email": order.customer_email,
            "lines": items.iter().map(|i| json!({
                "name": i.name,
                "quantity": i.quantity,
                "unit_price": i.unit_price,
                "line_total": i.quantity * i.unit_price,
            })).collect::<Vec<_>>(),
        });

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.json", order.id));
        tokio::fs::write(&path, serde_json::to_vec_pretty(&invoice)?).await?;
        tracing::info!(order_id = %order.id, path = %path.display(), "Invoice written");
        Ok(())
    }
}
