//! Payment Verifier
//!
//! Establishes that an inbound payment confirmation genuinely originates
//! from the claimed provider before any state mutation occurs. Both
//! checks fail closed: a missing secret, a timeout or any provider-side
//! ambiguity rejects the event.

use axum::http::HeaderMap;
use ring::hmac;
use thiserror::Error;

/// Verification failure — the event must never reach the finalizer
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no secret configured")]
    NoSecretConfigured,

    #[error("missing headers")]
    MissingHeaders,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("signature rejected")]
    SignatureRejected,
}

// =============================================================================
// Card provider: local constant-time HMAC check
// =============================================================================

/// Card-provider webhook verifier.
///
/// The provider signs `"{timestamp}.{raw_body}"` with a shared secret and
/// sends `x-card-signature: t=<unix>,v1=<hex>`. Verification recomputes
/// the HMAC-SHA256 and compares in constant time (`ring::hmac::verify`).
#[derive(Clone)]
pub struct CardWebhookVerifier {
    signing_secret: String,
    /// Maximum accepted age of the signed timestamp, seconds
    tolerance_secs: i64,
}

impl CardWebhookVerifier {
    pub const SIGNATURE_HEADER: &'static str = "x-card-signature";
    const DEFAULT_TOLERANCE_SECS: i64 = 300;

    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            tolerance_secs: Self::DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Verify the raw request body against the signature header.
    ///
    /// Pure and stateless; no outbound call.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<(), VerifyError> {
        if self.signing_secret.trim().is_empty() {
            // Never trust an event by absence of a check
            return Err(VerifyError::NoSecretConfigured);
        }

        let (timestamp, signature_hex) = parse_signature_header(signature_header)?;

        let now = chrono::Utc::now().timestamp();
        if (now - timestamp).abs() > self.tolerance_secs {
            tracing::warn!(timestamp, "Card webhook timestamp outside tolerance");
            return Err(VerifyError::InvalidSignature);
        }

        let signature =
            hex::decode(signature_hex).map_err(|_| VerifyError::InvalidSignature)?;

        let mut signed_payload = Vec::with_capacity(payload.len() + 16);
        signed_payload.extend_from_slice(timestamp.to_string().as_bytes());
        signed_payload.push(b'.');
        signed_payload.extend_from_slice(payload);

        let key = hmac::Key::new(hmac::HMAC_SHA256, self.signing_secret.as_bytes());
        hmac::verify(&key, &signed_payload, &signature)
            .map_err(|_| VerifyError::InvalidSignature)
    }

    #[cfg(test)]
    fn with_tolerance(mut self, secs: i64) -> Self {
        self.tolerance_secs = secs;
        self
    }
}

/// Parse `t=<unix>,v1=<hex>` into its parts
fn parse_signature_header(header: &str) -> Result<(i64, &str), VerifyError> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<&str> = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => signature = Some(v),
            _ => {}
        }
    }

    match (timestamp, signature) {
        (Some(t), Some(s)) if !s.is_empty() => Ok((t, s)),
        _ => Err(VerifyError::InvalidSignature),
    }
}

// =============================================================================
// Wallet provider: transmission headers + server-to-server re-validation
// =============================================================================

/// The five transmission headers the wallet provider attaches to every
/// webhook delivery. All are required; any absence fails verification.
#[derive(Debug, Clone)]
pub struct WalletTransmissionHeaders {
    pub transmission_id: String,
    pub transmission_time: String,
    pub cert_url: String,
    pub auth_algo: String,
    pub transmission_sig: String,
}

impl WalletTransmissionHeaders {
    pub const TRANSMISSION_ID: &'static str = "x-wallet-transmission-id";
    pub const TRANSMISSION_TIME: &'static str = "x-wallet-transmission-time";
    pub const CERT_URL: &'static str = "x-wallet-cert-url";
    pub const AUTH_ALGO: &'static str = "x-wallet-auth-algo";
    pub const TRANSMISSION_SIG: &'static str = "x-wallet-transmission-sig";

    /// Extract from request headers; any missing header is a hard failure.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, VerifyError> {
        let get = |name: &str| -> Result<String, VerifyError> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
                .ok_or(VerifyError::MissingHeaders)
        };
        Ok(Self {
            transmission_id: get(Self::TRANSMISSION_ID)?,
            transmission_time: get(Self::TRANSMISSION_TIME)?,
            cert_url: get(Self::CERT_URL)?,
            auth_algo: get(Self::AUTH_ALGO)?,
            transmission_sig: get(Self::TRANSMISSION_SIG)?,
        })
    }
}
