//! API route modules
//!
//! - [`health`] - liveness check
//! - [`products`] - catalog display and admin seeding
//! - [`checkout`] - order creation and shipping line append
//! - [`orders`] - order reads (admin/display)
//! - [`payments`] - payment event intake: webhooks and capture confirmation

pub mod checkout;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
