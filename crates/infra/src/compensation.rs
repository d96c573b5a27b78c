//! Compensation run when an order is cancelled.
//!
//! Panel cuts are undone exactly: every recorded `AxisCut` is added back to its source
//! panel, newest first. Remnant panels the order created are then retired if they are
//! back at their created size, which covers remnants the order itself cut later.
//! Materials and tools are not restored. Everything happens inside the caller's
//! transaction, so a failure here also aborts the state change.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use panelstock_core::{Actor, AggregateRoot, InventoryItemId};
use panelstock_inventory::{Axis, InventoryItem, MovementDelta, MovementKind, QualityState};
use panelstock_orders::{LineItem, LineItemDetail, LineItemKind, Order};

use crate::error::ServiceError;
use crate::ledger;
use crate::store::StoreTx;

/// What one compensation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompensationReport {
    /// Panel cuts added back to their source panels.
    pub restored: usize,
    /// Remnant panels taken out of circulation.
    pub retired_remnants: usize,
    /// Remnant panels left alone because they were changed after creation.
    pub kept_remnants: usize,
    pub deleted_line_items: u64,
}

/// Undo the panel allocations of `order`. The order row must already be locked by `tx`.
pub async fn compensate<T: StoreTx>(
    tx: &mut T,
    order: &Order,
    actor: &Actor,
    at: DateTime<Utc>,
) -> Result<CompensationReport, ServiceError> {
    let order_id = *order.id();
    let panel_items: Vec<LineItem> = tx
        .line_items(order_id)
        .await?
        .into_iter()
        .filter(|li| li.kind == LineItemKind::Panel)
        .collect();

    let mut report = CompensationReport::default();
    if panel_items.is_empty() {
        return Ok(report);
    }

    let mut ids = BTreeSet::new();
    for li in &panel_items {
        ids.insert(li.item_id);
        ids.extend(li.remnant_panels().iter().copied());
    }

    let mut locked: BTreeMap<InventoryItemId, InventoryItem> = BTreeMap::new();
    for id in ids {
        if let Some(item) = tx.lock_item(id).await? {
            locked.insert(id, item);
        }
    }

    let note = format!("compensation for cancelled order {order_id}");

    // Pass 1: add every cut back, newest first. Remnants are judged after all of the
    // order's own cuts are undone.
    let mut created_remnants = Vec::new();
    for li in panel_items.iter().rev() {
        let LineItemDetail::Panel {
            plan,
            consumed,
            remnant_panels,
            ..
        } = &li.detail
        else {
            continue;
        };

        let source = locked
            .get_mut(&li.item_id)
            .ok_or_else(|| ServiceError::not_found(format!("source panel {}", li.item_id)))?;
        ledger::record(
            tx,
            source,
            MovementKind::AdjustIn,
            MovementDelta::dimension(consumed.axis, consumed.amount),
            Some(order_id),
            actor,
            Some(&note),
            at,
        )
        .await?;
        report.restored += 1;

        let created = plan.new_panel();
        created_remnants.extend(remnant_panels.iter().map(|id| (*id, created)));
    }

    // Pass 2: retire remnants that are back at their created size.
    for (remnant_id, created) in created_remnants {
        let Some(remnant) = locked.get_mut(&remnant_id) else {
            warn!(order_id = %order_id, remnant_id = %remnant_id, "remnant panel missing, nothing to retire");
            continue;
        };
        let untouched = match (remnant.as_panel(), created) {
            (Some(p), Some(rect)) => {
                p.quality() == QualityState::Remnant && p.length() == rect.length && p.width() == rect.width
            }
            _ => false,
        };
        if !untouched {
            warn!(order_id = %order_id, remnant_id = %remnant_id, "remnant panel changed since creation, leaving it in stock");
            report.kept_remnants += 1;
            continue;
        }

        let length = remnant.panel_mut()?.length();
        // Zeroing one axis leaves no usable area.
        ledger::record(
            tx,
            remnant,
            MovementKind::AdjustOut,
            MovementDelta::dimension(Axis::Length, length),
            Some(order_id),
            actor,
            Some(&note),
            at,
        )
        .await?;
        remnant.panel_mut()?.retire();
        tx.update_item(remnant).await?;
        report.retired_remnants += 1;
    }

    report.deleted_line_items = tx.delete_line_items(order_id, LineItemKind::Panel).await?;

    info!(
        order_id = %order_id,
        version = order.version(),
        restored = report.restored,
        retired_remnants = report.retired_remnants,
        kept_remnants = report.kept_remnants,
        deleted_line_items = report.deleted_line_items,
        "order compensated"
    );
    Ok(report)
}
