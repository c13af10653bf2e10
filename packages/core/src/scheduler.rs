//! Background hosting sync.
//!
//! Drives the optional periodic reconciliation loop so the mirror catches up
//! with the hosting provider without an operator calling
//! `POST /api/admin/sync`.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::time;

use crate::error::AppError;
use crate::metrics::AppMetrics;
use crate::sync::{SyncReconciler, SyncReport};

/// Run the sync loop every `interval_seconds`, starting immediately.
///
/// A failed pass is logged and counted; the loop carries on with the next
/// tick. Runs until `Ctrl+C` (SIGINT) is received.
pub async fn run_periodic_sync(
    reconciler: Arc<SyncReconciler>,
    metrics: Arc<AppMetrics>,
    interval_seconds: u64,
) {
    let mut interval = time::interval(Duration::from_secs(interval_seconds));
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    tracing::info!("Periodic sync started (interval: {}s)", interval_seconds);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = sync_once(&reconciler, &metrics).await {
                    tracing::error!("Scheduled sync failed, retrying next tick: {}", err);
                }
            }

            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received. Stopping periodic sync.");
                break;
            }
        }
    }

    tracing::info!("Periodic sync stopped cleanly");
}

/// One reconciliation pass with its metrics. Shared by the scheduler and the
/// admin endpoint.
pub async fn sync_once(
    reconciler: &SyncReconciler,
    metrics: &AppMetrics,
) -> Result<SyncReport, AppError> {
    metrics.sync_runs_total.inc();
    match reconciler.reconcile().await {
        Ok(report) => {
            metrics.sites_synced.set(report.synced_count as f64);
            Ok(report)
        }
        Err(err) => {
            metrics.sync_errors_total.inc();
            Err(err)
        }
    }
}
