//! The two housekeeping jobs.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use panelstock_core::{Actor, OrderId};
use panelstock_orders::{ChangeOrderState, LineItemKind, OrderState};

use crate::error::{ErrorKind, ServiceError};
use crate::orders::OrderService;
use crate::retry::with_retry;
use crate::store::{InventoryStore, StoreTx};

/// System actor name recorded on everything housekeeping does.
pub const HOUSEKEEPING_ACTOR: &str = "housekeeping";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HousekeepingJob {
    AutoCancel,
    PurgeCompleted,
}

impl HousekeepingJob {
    pub const ALL: [HousekeepingJob; 2] = [HousekeepingJob::AutoCancel, HousekeepingJob::PurgeCompleted];

    pub fn as_str(self) -> &'static str {
        match self {
            HousekeepingJob::AutoCancel => "auto_cancel",
            HousekeepingJob::PurgeCompleted => "purge_completed",
        }
    }
}

impl core::fmt::Display for HousekeepingJob {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: HousekeepingJob,
    /// Orders the selection query returned.
    pub examined: usize,
    /// Orders cancelled, or orders whose panel line items were purged.
    pub affected: usize,
    /// Orders that no longer qualified once locked.
    pub skipped: usize,
    pub failed: usize,
}

impl JobReport {
    fn new(job: HousekeepingJob, examined: usize) -> Self {
        Self {
            job,
            examined,
            affected: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// Cancel `InProgress`/`Paused` orders created more than `window` before `now`.
///
/// Each order goes through [`OrderService::change_state`], so compensation runs exactly
/// as it does for a manual cancellation. Orders cancelled concurrently come back as
/// `InvalidTransition` and are skipped.
pub async fn auto_cancel_stale_orders<S: InventoryStore>(
    service: &OrderService<S>,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<JobReport, ServiceError> {
    let cutoff = now - window;
    let candidates = service
        .store()
        .orders_created_before(&[OrderState::InProgress, OrderState::Paused], cutoff)
        .await?;

    let mut report = JobReport::new(HousekeepingJob::AutoCancel, candidates.len());
    for order_id in candidates {
        let cmd = ChangeOrderState {
            order_id,
            target: OrderState::Cancelled,
            actor: Actor::system(HOUSEKEEPING_ACTOR),
            occurred_at: now,
        };
        match service.change_state(cmd).await {
            Ok(_) => report.affected += 1,
            Err(e) if e.kind() == ErrorKind::InvalidTransition => {
                debug!(order_id = %order_id, error = %e, "order no longer eligible for auto-cancel");
                report.skipped += 1;
            }
            Err(e) => {
                error!(order_id = %order_id, code = e.code(), error = %e, "auto-cancel failed");
                report.failed += 1;
            }
        }
    }

    info!(
        job = %report.job,
        cutoff = %cutoff,
        examined = report.examined,
        cancelled = report.affected,
        skipped = report.skipped,
        failed = report.failed,
        "auto-cancel finished"
    );
    Ok(report)
}

/// Delete the panel line items of orders completed more than `window` before `now`.
///
/// Order headers and the movement ledger are kept.
pub async fn purge_completed_panel_items<S: InventoryStore>(
    service: &OrderService<S>,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<JobReport, ServiceError> {
    let cutoff = now - window;
    let store = service.store().as_ref();
    let candidates = store.completed_orders_with_panels(cutoff).await?;

    let mut report = JobReport::new(HousekeepingJob::PurgeCompleted, candidates.len());
    let mut purged_rows = 0u64;
    for order_id in candidates {
        let result = with_retry(service.retry_policy(), "purge_panel_line_items", move || {
            purge_order(store, order_id, cutoff)
        })
        .await;
        match result {
            Ok(0) => report.skipped += 1,
            Ok(rows) => {
                purged_rows += rows;
                report.affected += 1;
            }
            Err(e) => {
                error!(order_id = %order_id, code = e.code(), error = %e, "purge failed");
                report.failed += 1;
            }
        }
    }

    info!(
        job = %report.job,
        cutoff = %cutoff,
        examined = report.examined,
        purged_orders = report.affected,
        purged_rows,
        skipped = report.skipped,
        failed = report.failed,
        "purge finished"
    );
    Ok(report)
}

async fn purge_order<S: InventoryStore>(
    store: &S,
    order_id: OrderId,
    cutoff: DateTime<Utc>,
) -> Result<u64, ServiceError> {
    let mut tx = store.begin().await?;
    let Some(order) = tx.lock_order(order_id).await? else {
        tx.rollback().await?;
        return Ok(0);
    };

    // Re-check under the lock; the selection query ran without one.
    let eligible = order.state() == OrderState::Completed && order.completed_at().is_some_and(|at| at < cutoff);
    if !eligible {
        tx.rollback().await?;
        return Ok(0);
    }

    let deleted = tx.delete_line_items(order_id, LineItemKind::Panel).await?;
    tx.commit().await?;
    Ok(deleted)
}
