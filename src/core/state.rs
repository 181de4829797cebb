//! Server state — shared handles for every request
//!
//! Cloned per request; every field is either `Clone`-cheap or Arc-backed.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::common::AppError;
use crate::core::Config;
use crate::db::repository::{OrderRepository, ProductRepository};
use crate::db::DbService;
use crate::notify::{JsonInvoiceWriter, LogMailer, NotificationDispatch};
use crate::payments::{
    CardWebhookVerifier, FinalizeError, FinalizedOrder, OrderFinalizer, PaymentEvent, WalletClient,
};

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: SqlitePool,
    pub card_verifier: CardWebhookVerifier,
    pub wallet: WalletClient,
    pub finalizer: OrderFinalizer,
    pub notify: NotificationDispatch,
}

impl ServerState {
    /// Initialize state from configuration: open the database, run
    /// migrations, build the payment components and collaborators.
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::Internal(format!("Failed to create work dir: {e}")))?;

        let db_path = config.database_path();
        let db = DbService::new(&db_path.to_string_lossy()).await?;

        Self::build(config.clone(), db.pool)
    }

    /// Assemble state around an existing pool (used by tests)
    pub fn build(config: Config, pool: SqlitePool) -> Result<Self, AppError> {
        let card_verifier = CardWebhookVerifier::new(config.payment.card_signing_secret.clone());
        let wallet = WalletClient::new(&config.payment, config.provider_timeout_ms)?;
        let finalizer = OrderFinalizer::new(pool.clone());
        let notify = NotificationDispatch::new(
            Arc::new(LogMailer),
            Arc::new(JsonInvoiceWriter::new(config.invoice_dir())),
        );

        Ok(Self {
            config,
            db: pool,
            card_verifier,
            wallet,
            finalizer,
            notify,
        })
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.db.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.db.clone())
    }

    /// Finalize a normalized payment event and, on a real pending → paid
    /// transition, emit the paid signal in the background.
    ///
    /// Dispatch runs detached so intake paths answer the provider within
    /// bounded time, and so that a mail or invoice failure can never undo
    /// or re-attempt the committed payment state.
    pub async fn finalize_and_notify(
        &self,
        event: &PaymentEvent,
    ) -> Result<FinalizedOrder, FinalizeError> {
        let result = self
            .finalizer
            .finalize(
                &event.order_id,
                event.provider,
                event.external_txn_id.as_deref(),
                event.asserted_amount,
            )
            .await?;

        if result.newly_paid {
            let notify = self.notify.clone();
            let order = result.order.clone();
            let items = result.items.clone();
            tokio::spawn(async move {
                notify.order_paid(&order, &items).await;
            });
        }

        Ok(result)
    }
}
