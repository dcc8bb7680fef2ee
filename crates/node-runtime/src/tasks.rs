//! Background tasks owned by the runtime.

use crate::container::DynReconciler;
use provenance_telemetry::{metric_inc, INTENTS_PENDING, INTENTS_RECONCILED};
use pv_04_lifecycle::ReconciliationReport;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Run `reconciler` every `interval` until `shutdown` flips to true.
///
/// The first pass runs immediately so intents left by a crash are picked
/// up at startup.
pub fn spawn_reconciler(
    reconciler: DynReconciler,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match reconciler.run_once().await {
                        Ok(report) => record_report(&report),
                        Err(e) => {
                            error!(error = %e, "Reconciliation pass failed");
                            metric_inc!(INTENTS_RECONCILED, &["error"]);
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Reconciler stopped");
                        break;
                    }
                }
            }
        }
    })
}

fn record_report(report: &ReconciliationReport) {
    let outcomes = [
        ("registered", report.registrations_applied),
        ("revoked", report.revocations_applied),
        ("already_applied", report.already_applied),
        ("reverted", report.reverted),
        ("abandoned", report.abandoned),
        ("error", report.errors),
    ];
    for (label, count) in outcomes {
        if count > 0 {
            INTENTS_RECONCILED
                .with_label_values(&[label])
                .inc_by(count as f64);
        }
    }
    INTENTS_PENDING.set(report.still_pending as f64);
}
