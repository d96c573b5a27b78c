use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use panelstock_core::{AggregateRoot, ExpectedVersion, InventoryItemId, OrderId};
use panelstock_inventory::{Balance, InventoryItem, InventoryMovement};
use panelstock_orders::{LineItem, LineItemKind, Order, OrderState, OrderView};

use super::r#trait::{InventoryStore, StoreError, StoreTx};

#[cfg(test)]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(test)]
use panelstock_inventory::MovementKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum RowKey {
    Order(OrderId),
    Item(InventoryItemId),
}

type RowLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    line_items: HashMap<OrderId, Vec<LineItem>>,
    items: HashMap<InventoryItemId, InventoryItem>,
    movements: Vec<InventoryMovement>,
}

/// Test-only fault injection.
#[cfg(test)]
#[derive(Debug, Default)]
struct Faults {
    failing_commits: AtomicU32,
    failing_movement: Mutex<Option<MovementKind>>,
}

#[derive(Debug)]
struct Shared {
    tables: RwLock<Tables>,
    row_locks: Mutex<HashMap<RowKey, RowLock>>,
    lock_timeout: Duration,
    #[cfg(test)]
    faults: Faults,
}

/// In-memory transactional store.
///
/// Intended for tests/dev. Each order and inventory row has its own async mutex; a
/// transaction holds the guards of every row it touched until commit or drop, and stages
/// its writes privately so nothing is visible before commit.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl InMemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                row_locks: Mutex::new(HashMap::new()),
                lock_timeout,
                #[cfg(test)]
                faults: Faults::default(),
            }),
        }
    }

    fn read_tables<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let tables = self
            .shared
            .tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(f(&tables))
    }

    /// Make the next `n` commits fail with a transient conflict.
    #[cfg(test)]
    pub(crate) fn fail_next_commits(&self, n: u32) {
        self.shared.faults.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Number of rows with a lock entry in the shared map.
    #[cfg(test)]
    pub(crate) fn tracked_row_locks(&self) -> usize {
        self.shared.row_locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    /// Make every append of `kind` fail with a backend error.
    #[cfg(test)]
    pub(crate) fn fail_movements_of_kind(&self, kind: Option<MovementKind>) {
        if let Ok(mut slot) = self.shared.faults.failing_movement.lock() {
            *slot = kind;
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(InMemoryTx {
            shared: self.shared.clone(),
            held: HeldLocks {
                shared: self.shared.clone(),
                guards: HashMap::new(),
            },
            orders: HashMap::new(),
            items: HashMap::new(),
            line_item_writes: Vec::new(),
            movements: Vec::new(),
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderView>, StoreError> {
        self.read_tables(|t| {
            t.orders.get(&id).map(|order| OrderView {
                order: order.clone(),
                line_items: t.line_items.get(&id).cloned().unwrap_or_default(),
            })
        })
    }

    async fn get_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        self.read_tables(|t| t.items.get(&id).cloned())
    }

    async fn movements_for_item(&self, id: InventoryItemId) -> Result<Vec<InventoryMovement>, StoreError> {
        self.read_tables(|t| t.movements.iter().filter(|m| m.item_id == id).cloned().collect())
    }

    async fn movements_for_order(&self, id: OrderId) -> Result<Vec<InventoryMovement>, StoreError> {
        self.read_tables(|t| {
            t.movements
                .iter()
                .filter(|m| m.order_id == Some(id))
                .cloned()
                .collect()
        })
    }

    async fn orders_created_before(
        &self,
        states: &[OrderState],
        created_before: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, StoreError> {
        self.read_tables(|t| {
            let mut ids: Vec<OrderId> = t
                .orders
                .values()
                .filter(|o| states.contains(&o.state()) && o.created_at() < created_before)
                .map(|o| *o.id())
                .collect();
            ids.sort();
            ids
        })
    }

    async fn completed_orders_with_panels(
        &self,
        completed_before: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, StoreError> {
        self.read_tables(|t| {
            let mut ids: Vec<OrderId> = t
                .orders
                .values()
                .filter(|o| o.state() == OrderState::Completed)
                .filter(|o| o.completed_at().is_some_and(|at| at < completed_before))
                .filter(|o| {
                    t.line_items
                        .get(o.id())
                        .is_some_and(|items| items.iter().any(|li| li.kind == LineItemKind::Panel))
                })
                .map(|o| *o.id())
                .collect();
            ids.sort();
            ids
        })
    }
}

/// Row guards of one transaction. Released together on commit or drop; lock entries
/// nobody else references are pruned from the shared map.
#[derive(Debug)]
struct HeldLocks {
    shared: Arc<Shared>,
    guards: HashMap<RowKey, OwnedMutexGuard<()>>,
}

impl HeldLocks {
    fn contains(&self, key: &RowKey) -> bool {
        self.guards.contains_key(key)
    }
}

impl Drop for HeldLocks {
    fn drop(&mut self) {
        if self.guards.is_empty() {
            return;
        }
        let keys: Vec<RowKey> = self.guards.drain().map(|(key, _guard)| key).collect();
        // Waiters clone the Arc under the map lock, so a count of one means the map is
        // the only owner.
        if let Ok(mut locks) = self.shared.row_locks.lock() {
            for key in keys {
                if locks.get(&key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                    locks.remove(&key);
                }
            }
        }
    }
}

#[derive(Debug)]
enum LineItemWrite {
    Insert(LineItem),
    Delete(OrderId, LineItemKind),
}

/// Open transaction on an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryTx {
    shared: Arc<Shared>,
    held: HeldLocks,
    orders: HashMap<OrderId, Order>,
    items: HashMap<InventoryItemId, InventoryItem>,
    line_item_writes: Vec<LineItemWrite>,
    movements: Vec<InventoryMovement>,
}

impl InMemoryTx {
    async fn acquire(&mut self, key: RowKey) -> Result<(), StoreError> {
        if self.held.contains(&key) {
            return Ok(());
        }
        let lock = {
            let mut locks = self
                .shared
                .row_locks
                .lock()
                .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
            locks.entry(key).or_default().clone()
        };
        let guard = tokio::time::timeout(self.shared.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                StoreError::LockTimeout(format!(
                    "{key:?} not acquired within {}ms",
                    self.shared.lock_timeout.as_millis()
                ))
            })?;
        self.held.guards.insert(key, guard);
        Ok(())
    }

    fn committed<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let tables = self
            .shared
            .tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(f(&tables))
    }

    fn current_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        if let Some(order) = self.orders.get(&id) {
            return Ok(Some(order.clone()));
        }
        self.committed(|t| t.orders.get(&id).cloned())
    }

    fn current_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        if let Some(item) = self.items.get(&id) {
            return Ok(Some(item.clone()));
        }
        self.committed(|t| t.items.get(&id).cloned())
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.acquire(RowKey::Order(id)).await?;
        self.current_order(id)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let id = *order.id();
        self.acquire(RowKey::Order(id)).await?;
        if self.current_order(id)?.is_some() {
            return Err(StoreError::Conflict(format!("order {id} already exists")));
        }
        self.orders.insert(id, order.clone());
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let id = *order.id();
        self.acquire(RowKey::Order(id)).await?;
        let current = self
            .current_order(id)?
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;
        ExpectedVersion::prior_to(order)
            .check(current.version())
            .map_err(|e| StoreError::Conflict(e.to_string()))?;
        self.orders.insert(id, order.clone());
        Ok(())
    }

    async fn line_items(&mut self, order_id: OrderId) -> Result<Vec<LineItem>, StoreError> {
        let mut items = self.committed(|t| t.line_items.get(&order_id).cloned().unwrap_or_default())?;
        for write in &self.line_item_writes {
            match write {
                LineItemWrite::Insert(li) if li.order_id == order_id => items.push(li.clone()),
                LineItemWrite::Delete(id, kind) if *id == order_id => items.retain(|li| li.kind != *kind),
                _ => {}
            }
        }
        Ok(items)
    }

    async fn insert_line_item(&mut self, item: &LineItem) -> Result<(), StoreError> {
        self.line_item_writes.push(LineItemWrite::Insert(item.clone()));
        Ok(())
    }

    async fn delete_line_items(&mut self, order_id: OrderId, kind: LineItemKind) -> Result<u64, StoreError> {
        let existing = self
            .line_items(order_id)
            .await?
            .iter()
            .filter(|li| li.kind == kind)
            .count() as u64;
        self.line_item_writes.push(LineItemWrite::Delete(order_id, kind));
        Ok(existing)
    }

    async fn lock_item(&mut self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        self.acquire(RowKey::Item(id)).await?;
        self.current_item(id)
    }

    async fn insert_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        let id = item.item_id();
        self.acquire(RowKey::Item(id)).await?;
        if self.current_item(id)?.is_some() {
            return Err(StoreError::Conflict(format!("inventory item {id} already exists")));
        }
        self.items.insert(id, item.clone());
        Ok(())
    }

    async fn update_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        let id = item.item_id();
        if !self.held.contains(&RowKey::Item(id)) {
            return Err(StoreError::Backend(format!("inventory item {id} updated without a lock")));
        }
        if self.current_item(id)?.is_none() {
            return Err(StoreError::NotFound(format!("inventory item {id}")));
        }
        self.items.insert(id, item.clone());
        Ok(())
    }

    async fn append_movement(&mut self, movement: &InventoryMovement) -> Result<(), StoreError> {
        #[cfg(test)]
        {
            let failing = self
                .shared
                .faults
                .failing_movement
                .lock()
                .map(|slot| *slot)
                .unwrap_or(None);
            if failing == Some(movement.kind) {
                return Err(StoreError::Backend(format!("injected failure appending {}", movement.kind)));
            }
        }
        self.movements.push(movement.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        #[cfg(test)]
        {
            let faults = &self.shared.faults;
            if faults
                .failing_commits
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Conflict("injected serialization failure".to_string()));
            }
        }

        let InMemoryTx {
            shared,
            held,
            orders,
            items,
            line_item_writes,
            movements,
        } = self;

        {
            let mut tables = shared
                .tables
                .write()
                .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

            tables.orders.extend(orders);
            tables.items.extend(items);
            for write in line_item_writes {
                match write {
                    LineItemWrite::Insert(li) => tables.line_items.entry(li.order_id).or_default().push(li),
                    LineItemWrite::Delete(order_id, kind) => {
                        if let Some(list) = tables.line_items.get_mut(&order_id) {
                            list.retain(|li| li.kind != kind);
                        }
                    }
                }
            }
            tables.movements.extend(movements);
        }

        drop(held);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
