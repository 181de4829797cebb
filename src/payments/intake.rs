//! Payment Event Intake
//!
//! Decodes each provider's webhook payload shape into the normalized
//! [`PaymentEvent`], and decides which provider-native event types
//! warrant finalization at all. Provider-shape branching ends here.

use serde::Deserialize;

use super::{wallet, PaymentEvent, PaymentProvider};

/// What the intake layer decided about a verified delivery
#[derive(Debug)]
pub enum IntakeDecision {
    /// Hand this normalized event to the finalizer
    Finalize(PaymentEvent),
    /// Acknowledge to the provider without acting
    Ignore(String),
}

// =============================================================================
// Card provider payload
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CardEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: CardEventData,
}

#[derive(Debug, Deserialize, Default)]
pub struct CardEventData {
    #[serde(default)]
    pub object: CardSession,
}

#[derive(Debug, Deserialize, Default)]
pub struct CardSession {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: CardMetadata,
}

#[derive(Debug, Deserialize, Default)]
pub struct CardMetadata {
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Normalize a verified card-provider event.
///
/// Only "checkout session completed" triggers finalization; everything
/// else is acknowledged so the provider stops retrying. The internal
/// order id travels in the session metadata the checkout was created
/// with — without it the event cannot be acted on.
pub fn normalize_card_event(event: &CardEvent) -> IntakeDecision {
    if event.event_type != "checkout.session.completed" {
        return IntakeDecision::Ignore(format!(
            "card event type {} is not actionable",
            event.event_type
        ));
    }

    let session = &event.data.object;
    let Some(order_id) = session.metadata.order_id.clone() else {
        return IntakeDecision::Ignore(
            "completed card session carries no order id metadata".to_string(),
        );
    };

    IntakeDecision::Finalize(PaymentEvent {
        provider: PaymentProvider::Card,
        order_id,
        external_txn_id: session.id.clone(),
        asserted_amount: session.amount_total,
    })
}

// =============================================================================
// Wallet provider payload
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct WalletEvent {
    pub event_type: String,
    #[serde(default)]
    pub resource: WalletResource,
}

#[derive(Debug, Deserialize, Default)]
pub struct WalletResource {
    #[serde(default)]
    pub id: Option<String>,
    /// Internal order id attached at provider-order creation
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub amount: Option<WalletAmount>,
}

#[derive(Debug, Deserialize)]
pub struct WalletAmount {
    #[serde(default)]
    pub currency_code: Option<String>,
    pub value: String,
}

/// Normalize a verified wallet-provider event.
///
/// Only "capture completed" is acted on. Denied, refunded and reversed
/// captures are logged for future handling — reversal of a paid order is
/// a deliberately unimplemented extension point, not wired here.
pub fn normalize_wallet_event(event: &WalletEvent) -> IntakeDecision {
    match event.event_type.as_str() {
        "PAYMENT.CAPTURE.COMPLETED" => {}
        "PAYMENT.CAPTURE.DENIED"
        | "PAYMENT.CAPTURE.REFUNDED"
        | "PAYMENT.CAPTURE.REVERSED" => {
            tracing::warn!(
                event_type = %event.event_type,
                resource_id = ?event.resource.id,
                "Wallet reversal-class event received, no automatic handling"
            );
            return IntakeDecision::Ignore(format!(
                "wallet event type {} is logged but not acted on",
                event.event_type
            ));
        }
        other => {
            return IntakeDecision::Ignore(format!(
                "wallet event type {other} is not actionable"
            ));
        }
    }

    let Some(order_id) = event.resource.custom_id.clone() else {
        return IntakeDecision::Ignore(
            "completed wallet capture carries no order id".to_string(),
        );
    };

    let asserted_amount = event
        .resource
        .amount
        .as_ref()
        .and_then(|a| wallet::decimal_string_to_minor_units(&a.value));

    IntakeDecision::Finalize(PaymentEvent {
        provider: PaymentProvider::Wallet,
        order_id,
        external_txn_id: event.resource.id.clone(),
        asserted_amount,
    })
}
