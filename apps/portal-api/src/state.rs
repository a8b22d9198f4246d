//! Shared application state handed to every handler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lgu_db::Database;

use crate::config::PortalConfig;

/// Source of "now" for expiry, due dates and receipts.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock tests can move by hand.
#[derive(Debug)]
pub struct FixedClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        FixedClock {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Request-scoped context: database, configuration and clock.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<PortalConfig>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(db: Database, config: PortalConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(db: Database, config: PortalConfig, clock: Arc<dyn Clock>) -> Self {
        AppState {
            db,
            config: Arc::new(config),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
