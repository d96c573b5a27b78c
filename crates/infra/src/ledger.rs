//! Ledger writes: one movement appended and applied to its item's balance.
//!
//! The movement is built and applied in memory first, so a `NegativeBalance` or a
//! mismatched delta is rejected before anything is staged in the transaction.

use chrono::{DateTime, Utc};
use tracing::debug;

use panelstock_core::{Actor, OrderId};
use panelstock_inventory::{Balance, InventoryItem, InventoryMovement, MovementDelta, MovementKind};

use crate::error::ServiceError;
use crate::store::StoreTx;

/// Append one movement for `item` and write the updated balance.
///
/// `item` must have been loaded through `tx.lock_item` (or inserted by `tx`); it is
/// mutated in place so callers can keep recording against the same value.
#[allow(clippy::too_many_arguments)]
pub async fn record<T: StoreTx>(
    tx: &mut T,
    item: &mut InventoryItem,
    kind: MovementKind,
    delta: MovementDelta,
    order_ref: Option<OrderId>,
    actor: &Actor,
    notes: Option<&str>,
    at: DateTime<Utc>,
) -> Result<InventoryMovement, ServiceError> {
    let mut movement = InventoryMovement::new(item.item_id(), kind, delta, order_ref, actor.clone(), at)?;
    if let Some(notes) = notes {
        movement = movement.with_notes(notes);
    }

    let mut next = item.clone();
    next.apply_movement(kind, &delta)?;

    tx.update_item(&next).await?;
    tx.append_movement(&movement).await?;
    *item = next;

    debug!(
        item_id = %movement.item_id,
        kind = %kind,
        axis = ?delta.axis(),
        order_id = ?order_ref,
        "movement recorded"
    );
    Ok(movement)
}
