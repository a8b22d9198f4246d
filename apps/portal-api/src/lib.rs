//! # LGU Portal API
//!
//! HTTP surface of the municipal portal: business tax computation, RPT
//! registration review and statements, and the OTP-gated payment flow.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Portal API                                    │
//! │                                                                         │
//! │  Browser ──► axum routes ──► services ──► lgu-core rules               │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │                              lgu-db ──► SQLite                         │
//! │                                 ▲                                       │
//! │  reconcile worker ──────────────┘  (retries failed ledger syncs,       │
//! │                                      marks overdue quarters)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod reconcile;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::PortalConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::{AppState, Clock, FixedClock, SystemClock};

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
