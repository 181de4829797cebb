//! Wallet provider API client
//!
//! Server-to-server calls against the wallet provider: OAuth2 token,
//! provider-order creation, capture, and webhook re-validation. Every
//! request carries the configured timeout; a timeout is treated as
//! failure, never as an implicit pass.

use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::common::AppError;
use crate::core::PaymentConfig;

use super::verify::{VerifyError, WalletTransmissionHeaders};

/// Wallet provider API client
#[derive(Clone)]
pub struct WalletClient {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    webhook_id: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Capture response, kept as raw JSON because the provider nests the
/// status field inconsistently between schema versions.
#[derive(Debug, Clone)]
pub struct WalletCaptureResult {
    pub status: String,
    pub capture_id: Option<String>,
    /// Captured amount in minor units, when the provider reported one
    pub amount_minor: Option<i64>,
    /// Internal order id attached at provider-order creation; callers
    /// cross-check it against the order they are about to finalize
    pub custom_id: Option<String>,
    pub raw: serde_json::Value,
}

impl WalletClient {
    pub fn new(config: &PaymentConfig, timeout_ms: u64) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_base: config.wallet_api_base.clone(),
            client_id: config.wallet_client_id.clone(),
            client_secret: config.wallet_client_secret.clone(),
            webhook_id: config.wallet_webhook_id.clone(),
        })
    }

    async fn access_token(&self) -> Result<String, AppError> {
        let resp = self
            .http
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("token request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "token request rejected: {}",
                resp.status()
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed token response: {e}")))?;
        Ok(token.access_token)
    }

    /// Create a provider-side order for an internal order.
    ///
    /// The provider speaks decimal strings ("47.50"), so the minor-unit
    /// amount is rendered through `rust_decimal` — the same convention the
    /// capture path later reconciles against.
    pub async fn create_order(
        &self,
        internal_order_id: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<String, AppError> {
        let token = self.access_token().await?;
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "custom_id": internal_order_id,
                "amount": {
                    "currency_code": currency,
                    "value": minor_units_to_decimal_string(amount_minor),
                },
            }],
        });

        let resp = self
            .http
            .post(format!("{}/v2/checkout/orders", self.api_base))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("order creation failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "order creation rejected: {}",
                resp.status()
            )));
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed order response: {e}")))?;
        value
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Upstream("order response missing id".into()))
    }

    /// Capture a provider order using server-held credentials.
    ///
    /// This is the authoritative check for the client-driven flow: only
    /// the provider's direct response is trusted, never a client-asserted
    /// status field.
    pub async fn capture_order(
        &self,
        provider_order_id: &str,
    ) -> Result<WalletCaptureResult, AppError> {
        let token = self.access_token().await?;

        let resp = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.api_base, provider_order_id
            ))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("capture call failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "capture rejected: {}",
                resp.status()
            )));
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed capture response: {e}")))?;

        Ok(parse_capture_response(raw))
    }

    /// Re-validate a webhook delivery with the provider.
    ///
    /// Succeeds only on an explicit `verification_status == "SUCCESS"`;
    /// any other response, a network failure or a timeout rejects the
    /// signature (fail closed).
    pub async fn verify_webhook(
        &self,
        headers: &WalletTransmissionHeaders,
        event: &serde_json::Value,
    ) -> Result<(), VerifyError> {
        let token = match self.access_token().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "Wallet verification token request failed");
                return Err(VerifyError::SignatureRejected);
            }
        };

        let body = json!({
            "transmission_id": headers.transmission_id,
            "transmission_time": headers.transmission_time,
            "cert_url": headers.cert_url,
            "auth_algo": headers.auth_algo,
            "transmission_sig": headers.transmission_sig,
            "webhook_id": self.webhook_id,
            "webhook_event": event,
        });

        let resp = self
            .http
            .post(format!(
                "{}/v1/notifications/verify-webhook-signature",
                self.api_base
            ))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await;

        let resp = match resp {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = %r.status(), "Wallet verification call rejected");
                return Err(VerifyError::SignatureRejected);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Wallet verification call failed");
                return Err(VerifyError::SignatureRejected);
            }
        };

        let value: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(_) => return Err(VerifyError::SignatureRejected),
        };

        match value.get("verification_status").and_then(|v| v.as_str()) {
            Some("SUCCESS") => Ok(()),
            other => {
                tracing::warn!(status = ?other, "Wallet verification not successful");
                Err(VerifyError::SignatureRejected)
            }
        }
    }
}

/// Extract status and capture id, checking both the top level and the
/// nested capture object — the provider's schema nests it inconsistently.
fn parse_capture_response(raw: serde_json::Value) -> WalletCaptureResult {
    let nested_capture = raw
        .pointer("/purchase_units/0/payments/captures/0")
        .cloned();

    let status = raw
        .get("status")
        .and_then(|v| v.as_str())
        .or_else(|| {
            nested_capture
                .as_ref()
                .and_then(|c| c.get("status"))
                .and_then(|v| v.as_str())
        })
        .unwrap_or("UNKNOWN")
        .to_string();

    let capture_id = nested_capture
        .as_ref()
        .and_then(|c| c.get("id"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| {
            raw.get("id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        });

    let amount_minor = nested_capture
        .as_ref()
        .and_then(|c| c.pointer("/amount/value"))
        .and_then(|v| v.as_str())
        .and_then(decimal_string_to_minor_units);

    let custom_id = nested_capture
        .as_ref()
        .and_then(|c| c.get("custom_id"))
        .and_then(|v| v.as_str())
        .or_else(|| {
            raw.pointer("/purchase_units/0/custom_id")
                .and_then(|v| v.as_str())
        })
        .map(|s| s.to_string());

    WalletCaptureResult {
        status,
        capture_id,
        amount_minor,
        custom_id,
        raw,
    }
}

/// Render minor units as the provider's decimal-string convention
pub fn minor_units_to_decimal_string(amount_minor: i64) -> String {
    Decimal::new(amount_minor, 2).to_string()
}

/// Parse the provider's decimal string back into minor units
pub fn decimal_string_to_minor_units(value: &str) -> Option<i64> {
    let dec: Decimal = value.trim().parse().ok()?;
    (dec * Decimal::from(100)).round().to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_minor_units_as_decimal() {
        assert_eq!(minor_units_to_decimal_string(4750), "47.50");
        assert_eq!(minor_units_to_decimal_string(5), "0.05");
        assert_eq!(minor_units_to_decimal_string(100), "1.00");
    }

    #[test]
    fn parses_decimal_back_to_minor_units() {
        assert_eq!(decimal_string_to_minor_units("47.50"), Some(4750));
        assert_eq!(decimal_string_to_minor_units("0.05"), Some(5));
        assert_eq!(decimal_string_to_minor_units("12"), Some(1200));
        assert_eq!(decimal_string_to_minor_units("not-money"), None);
    }

    #[test]
    fn capture_status_read_from_top_level() {
        let result = parse_capture_response(json!({
            "id": "PO-1",
            "status": "COMPLETED",
        }));
        assert_eq!(result.status, "COMPLETED");
        assert_eq!(result.capture_id.as_deref(), Some("PO-1"));
    }

    #[test]
    fn capture_status_read_from_nested_capture_object() {
        let result = parse_capture_response(json!({
            "id": "PO-2",
            "purchase_units": [{
                "payments": { "captures": [{
                    "id": "CAP-9",
                    "status": "COMPLETED",
                    "custom_id": "ord-42",
                    "amount": { "currency_code": "EUR", "value": "47.50" }
                }] }
            }]
        }));
        assert_eq!(result.status, "COMPLETED");
        assert_eq!(result.capture_id.as_deref(), Some("CAP-9"));
        assert_eq!(result.amount_minor, Some(4750));
        assert_eq!(result.custom_id.as_deref(), Some("ord-42"));
    }

    #[test]
    fn capture_custom_id_falls_back_to_purchase_unit() {
        let result = parse_capture_response(json!({
            "id": "PO-4",
            "status": "COMPLETED",
            "purchase_units": [{ "custom_id": "ord-7" }]
        }));
        assert_eq!(result.custom_id.as_deref(), Some("ord-7"));

        let without = parse_capture_response(json!({ "id": "PO-5", "status": "COMPLETED" }));
        assert_eq!(without.custom_id, None);
    }

    #[test]
    fn capture_status_unknown_when_absent() {
        let result = parse_capture_response(json!({ "id": "PO-3" }));
        assert_eq!(result.status, "UNKNOWN");
    }
}
