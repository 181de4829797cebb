//! Normalized payment event
//!
//! Constructed by the intake layer from a verified provider payload,
//! consumed once by the finalizer, then discarded. Never persisted —
//! "this event was processed" is derived from the order's own state.

use super::PaymentProvider;

/// A verified payment confirmation, provider shape already stripped
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub provider: PaymentProvider,
    /// Internal order id recovered from provider metadata
    pub order_id: String,
    /// Provider-side transaction/capture id; missing only on degraded paths
    pub external_txn_id: Option<String>,
    /// Amount the provider claims was paid, minor units. Advisory only:
    /// a mismatch against the order total is logged, never fatal.
    pub asserted_amount: Option<i64>,
}
