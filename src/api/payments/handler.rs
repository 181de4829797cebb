//! Payment intake handlers
//!
//! Response contract, shared by both webhook routes: 200 + ack body when
//! the event was handled or deliberately ignored (including unknown
//! orders — retrying those can never succeed), 400 on verification or
//! parse failure, 5xx only when the atomic commit failed so the provider
//! retries later.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::common::{ok, AppError, AppResponse, AppResult};
use crate::core::ServerState;
use crate::db::models::{Order, OrderStatus};
use crate::payments::intake::{self, CardEvent, IntakeDecision, WalletEvent};
use crate::payments::{
    finalize::FinalizeError, CardWebhookVerifier, PaymentEvent, PaymentProvider,
    WalletTransmissionHeaders,
};

/// Run a normalized event through the finalizer with webhook semantics:
/// unknown order is acknowledged, storage failure is not.
async fn finalize_for_webhook(
    state: &ServerState,
    event: PaymentEvent,
) -> AppResult<Json<AppResponse<Value>>> {
    match state.finalize_and_notify(&event).await {
        Ok(result) => Ok(ok(json!({
            "received": true,
            "order_id": result.order.id,
            "newly_paid": result.newly_paid,
        }))),
        Err(FinalizeError::NotFound(msg)) => {
            // Acknowledge anyway: a retry for a nonexistent order will
            // never succeed, so do not trigger the provider's retry loop.
            tracing::warn!(order_id = %event.order_id, %msg, "Webhook for unknown order acknowledged");
            Ok(ok(json!({ "received": true, "order_id": event.order_id })))
        }
        Err(e @ FinalizeError::Storage(_)) => Err(e.into()),
    }
}

// =============================================================================
// Card provider webhook
// =============================================================================

pub async fn card_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<AppResponse<Value>>> {
    let signature = headers
        .get(CardWebhookVerifier::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Verification("missing headers".into()))?;

    state.card_verifier.verify(&body, signature)?;

    let event: CardEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed card event: {e}")))?;

    match intake::normalize_card_event(&event) {
        IntakeDecision::Finalize(ev) => finalize_for_webhook(&state, ev).await,
        IntakeDecision::Ignore(reason) => {
            tracing::info!(event_type = %event.event_type, %reason, "Card event acknowledged without action");
            Ok(ok(json!({ "received": true })))
        }
    }
}

// =============================================================================
// Wallet provider webhook
// =============================================================================

pub async fn wallet_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<AppResponse<Value>>> {
    let transmission = WalletTransmissionHeaders::from_headers(&headers)?;

    let raw: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed wallet event: {e}")))?;

    // Server-to-server re-validation; timeout or any ambiguity fails closed
    state.wallet.verify_webhook(&transmission, &raw).await?;

    let event: WalletEvent = serde_json::from_value(raw)
        .map_err(|e| AppError::Validation(format!("malformed wallet event: {e}")))?;

    match intake::normalize_wallet_event(&event) {
        IntakeDecision::Finalize(ev) => finalize_for_webhook(&state, ev).await,
        IntakeDecision::Ignore(reason) => {
            tracing::info!(event_type = %event.event_type, %reason, "Wallet event acknowledged without action");
            Ok(ok(json!({ "received": true })))
        }
    }
}

// =============================================================================
// Wallet synchronous flow: provider-order creation + capture confirmation
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateWalletOrderRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateWalletOrderResponse {
    pub provider_order_id: String,
}

/// Create the provider-side wallet order for a pending internal order
pub async fn create_wallet_order(
    State(state): State<ServerState>,
    Json(payload): Json<CreateWalletOrderRequest>,
) -> AppResult<Json<CreateWalletOrderResponse>> {
    let order = state
        .orders()
        .find_by_id(&payload.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", payload.order_id)))?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::BusinessRule(format!(
            "Order {} is already paid",
            order.id
        )));
    }

    let provider_order_id = state
        .wallet
        .create_order(&order.id, order.amount_total, &order.currency)
        .await?;

    Ok(Json(CreateWalletOrderResponse { provider_order_id }))
}

#[derive(Debug, Deserialize)]
pub struct CaptureQuery {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub capture_status: String,
    pub order: Order,
}

/// Capture confirmation for the client-driven wallet flow.
///
/// The client only tells us which provider order to settle; the capture
/// itself runs server-to-server and only the provider's direct response
/// is trusted. Error payloads name the failed step (capture vs finalize)
/// for support diagnosis.
pub async fn capture_confirmation(
    State(state): State<ServerState>,
    Path(provider_order_id): Path<String>,
    Query(query): Query<CaptureQuery>,
) -> AppResult<Json<CaptureResponse>> {
    let capture = state
        .wallet
        .capture_order(&provider_order_id)
        .await
        .map_err(|e| AppError::Upstream(format!("capture call failed: {e}")))?;

    if capture.status != "COMPLETED" {
        return Err(AppError::BusinessRule(format!(
            "capture call failed: provider returned status {}",
            capture.status
        )));
    }

    // The provider order carries our order id from create_order; a capture
    // claiming a different order must not settle the one in the query.
    if let Some(custom_id) = capture.custom_id.as_deref() {
        if custom_id != query.order_id {
            tracing::warn!(
                provider_order_id,
                capture_order = custom_id,
                claimed_order = %query.order_id,
                "Capture belongs to a different order, rejecting"
            );
            return Err(AppError::BusinessRule(format!(
                "capture call failed: capture belongs to order {custom_id}"
            )));
        }
    }

    let event = PaymentEvent {
        provider: PaymentProvider::Wallet,
        order_id: query.order_id.clone(),
        external_txn_id: capture.capture_id.clone(),
        asserted_amount: capture.amount_minor,
    };

    let result = state
        .finalize_and_notify(&event)
        .await
        .map_err(|e| match e {
            FinalizeError::NotFound(_) => {
                AppError::NotFound(format!("finalize failed: order {} not found", query.order_id))
            }
            FinalizeError::Storage(msg) => AppError::Database(format!("finalize failed: {msg}")),
        })?;

    Ok(Json(CaptureResponse {
        capture_status: capture.status,
        order: result.order,
    }))
}
