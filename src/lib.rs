//! Shop Server - storefront backend
//!
//! # Architecture
//!
//! - **HTTP API** (`api`): catalog, checkout, order reads, payment intake
//! - **Database** (`db`): embedded SQLite via sqlx, repository per table
//! - **Payments** (`payments`): verification, event normalization and the
//!   order finalizer — the single path from pending to paid
//! - **Notifications** (`notify`): confirmation mail + invoice dispatch,
//!   fired only after a committed paid transition
//!
//! # Module structure
//!
//! ```text
//! src/
//! ├── core/       # configuration, state, server lifecycle
//! ├── common/     # errors, responses, logging
//! ├── db/         # models and repositories
//! ├── payments/   # verify, intake, wallet client, finalizer
//! ├── notify/     # post-payment collaborators
//! ├── api/        # HTTP routes and handlers
//! └── routes/     # router assembly and middleware
//! ```

pub mod api;
pub mod common;
pub mod core;
pub mod db;
pub mod notify;
pub mod payments;
pub mod routes;

// Re-export public types
pub use common::{AppError, AppResult};
pub use core::{Config, Server, ServerState};
pub use payments::{OrderFinalizer, PaymentEvent, PaymentProvider};
