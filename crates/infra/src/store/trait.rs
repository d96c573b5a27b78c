use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use panelstock_core::{InventoryItemId, OrderId};
use panelstock_inventory::{InventoryItem, InventoryMovement};
use panelstock_orders::{LineItem, LineItemKind, Order, OrderState, OrderView};

/// Storage-level failure.
///
/// These are infrastructure errors (locking, connectivity, row mapping) as opposed to
/// domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row lock could not be acquired within the configured timeout.
    #[error("lock timeout: {0}")]
    LockTimeout(String),

    /// Serialization failure, deadlock, duplicate key or stale version.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend is unreachable or the pool is closed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Anything else the backend reported (row decoding, constraint violations).
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the whole transaction may succeed if retried from scratch.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::LockTimeout(_) | StoreError::Conflict(_))
    }
}

/// Transactional store for orders, line items, inventory rows and the movement ledger.
///
/// All mutations go through a [`StoreTx`]. Reads on the store itself see committed
/// state only and take no locks.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    type Tx: StoreTx;

    /// Open a transaction. Dropping it without `commit` rolls back.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderView>, StoreError>;

    async fn get_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError>;

    /// Ledger entries for one item, oldest first.
    async fn movements_for_item(&self, id: InventoryItemId) -> Result<Vec<InventoryMovement>, StoreError>;

    /// Ledger entries referencing one order, oldest first.
    async fn movements_for_order(&self, id: OrderId) -> Result<Vec<InventoryMovement>, StoreError>;

    /// Orders in any of `states` created strictly before `created_before`.
    async fn orders_created_before(
        &self,
        states: &[OrderState],
        created_before: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, StoreError>;

    /// Completed orders whose `completed_at` is strictly before `completed_before` and
    /// that still have panel line items.
    async fn completed_orders_with_panels(
        &self,
        completed_before: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, StoreError>;
}

/// One open transaction.
///
/// `lock_*` calls take a row lock held until commit or drop. Callers lock the order row
/// first, then inventory rows in ascending id order.
#[async_trait]
pub trait StoreTx: Send {
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    /// Write `order` over the row it was read from; fails with `Conflict` if the stored
    /// version is not the one immediately before `order.version()`.
    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn line_items(&mut self, order_id: OrderId) -> Result<Vec<LineItem>, StoreError>;

    async fn insert_line_item(&mut self, item: &LineItem) -> Result<(), StoreError>;

    /// Delete every line item of `kind` on the order, returning how many went.
    async fn delete_line_items(&mut self, order_id: OrderId, kind: LineItemKind) -> Result<u64, StoreError>;

    async fn lock_item(&mut self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError>;

    /// Insert a new inventory row; the row is locked by this transaction.
    async fn insert_item(&mut self, item: &InventoryItem) -> Result<(), StoreError>;

    async fn update_item(&mut self, item: &InventoryItem) -> Result<(), StoreError>;

    async fn append_movement(&mut self, movement: &InventoryMovement) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
