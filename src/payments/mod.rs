//! Payments: verification, normalization and order finalization
//!
//! Provider-specific payload shapes stop at [`intake`]; everything past
//! that boundary works on one normalized [`PaymentEvent`] and the
//! finalizer never sees provider branching.

pub mod event;
pub mod finalize;
pub mod intake;
pub mod verify;
pub mod wallet;

pub use event::PaymentEvent;
pub use finalize::{FinalizeError, FinalizedOrder, OrderFinalizer};
pub use verify::{CardWebhookVerifier, VerifyError, WalletTransmissionHeaders};
pub use wallet::WalletClient;

use serde::{Deserialize, Serialize};

/// External payment service identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentProvider {
    Card,
    Wallet,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Card => "card",
            PaymentProvider::Wallet => "wallet",
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
