//! # Ledger Reconciliation Worker
//!
//! Background task that drains the payment sync outbox and keeps overdue
//! quarters current.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  every interval_secs                                                   │
//! │  ├── list_sync_failed(batch_size, max_sync_attempts)                   │
//! │  │     └── for each: apply ledger update ──► synced | failed (+1 try)  │
//! │  ├── list_sync_exhausted(max_sync_attempts) ──► warn log for ops       │
//! │  └── mark_overdue(today, penalty policy)                               │
//! │                                                                         │
//! │  shutdown signal ──► finish current tick, exit                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use lgu_core::SyncStatus;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::services::payment::sync_ledger;
use crate::state::AppState;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub retried: usize,
    pub synced: usize,
    pub still_failed: usize,
    /// Failed syncs past the retry cap, left for manual reconciliation.
    pub exhausted: usize,
    pub marked_overdue: u64,
}

/// Runs one reconciliation pass.
pub async fn run_once(state: &AppState) -> TickReport {
    let mut report = TickReport::default();
    let now = state.now();
    let payments = state.db.payments();
    let max_attempts = state.config.reconcile.max_sync_attempts;

    match payments
        .list_sync_failed(state.config.reconcile.batch_size, max_attempts)
        .await
    {
        Ok(failed) => {
            for payment in &failed {
                report.retried += 1;
                match sync_ledger(&state.db, &state.config, payment, now).await {
                    SyncStatus::Synced => report.synced += 1,
                    _ => report.still_failed += 1,
                }
            }
        }
        Err(e) => error!(error = %e, "Could not load failed ledger syncs"),
    }

    match payments.list_sync_exhausted(max_attempts).await {
        Ok(exhausted) => {
            report.exhausted = exhausted.len();
            for payment in &exhausted {
                warn!(
                    payment_id = %payment.payment_id,
                    receipt = payment.receipt_number.as_deref().unwrap_or_default(),
                    attempts = payment.sync_attempts,
                    last_attempt = ?payment.last_sync_attempt_at,
                    error = payment.system_error.as_deref().unwrap_or_default(),
                    "Ledger sync not retried, attempts exhausted"
                );
            }
        }
        Err(e) => error!(error = %e, "Could not load exhausted ledger syncs"),
    }

    match state
        .db
        .ledger()
        .mark_overdue(now.date_naive(), &state.config.penalty_policy())
        .await
    {
        Ok(changed) => report.marked_overdue = changed,
        Err(e) => error!(error = %e, "Overdue sweep failed"),
    }

    if report.retried > 0 || report.marked_overdue > 0 {
        info!(
            retried = report.retried,
            synced = report.synced,
            still_failed = report.still_failed,
            exhausted = report.exhausted,
            marked_overdue = report.marked_overdue,
            "Reconciliation tick"
        );
    } else {
        debug!("Reconciliation tick: nothing to do");
    }

    report
}

/// Spawns the worker. It stops when `shutdown` flips to `true`.
pub fn spawn(state: AppState, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.reconcile.interval_secs);

    tokio::spawn(async move {
        info!(interval_secs = period.as_secs(), "Reconciliation worker started");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_once(&state).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Reconciliation worker stopped");
    })
}
