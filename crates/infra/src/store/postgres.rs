//! Postgres-backed store.
//!
//! Row locks are real `SELECT … FOR UPDATE` locks, bounded by `SET LOCAL lock_timeout`
//! at the start of every transaction. The schema lives in `migrations/`.
//!
//! ## Error Mapping
//!
//! | PostgreSQL code | Meaning | `StoreError` |
//! |---|---|---|
//! | `55P03` | lock not available | `LockTimeout` |
//! | `40001` | serialization failure | `Conflict` |
//! | `40P01` | deadlock detected | `Conflict` |
//! | `23505` | unique violation | `Conflict` |
//! | other database errors | | `Backend` |
//! | pool closed / timed out, IO | | `Unavailable` |

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument};

use panelstock_core::{AggregateRoot, DomainError, InventoryItemId, Length, OrderId, Quantity};
use panelstock_inventory::{
    Axis, Balance, InventoryItem, InventoryMovement, MovementDelta, NewPanel, NewStockItem, Panel, StockItem,
};
use panelstock_orders::{LineItem, LineItemKind, Order, OrderSnapshot, OrderState, OrderView};

use super::r#trait::{InventoryStore, StoreError, StoreTx};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const ORDER_COLUMNS: &str =
    "id, client_ref, state, priority, created_at, updated_at, completed_at, version";

const ITEM_COLUMNS: &str = "id, kind, name, length_mm, width_mm, quality, location, unit_price, \
     source_panel, origin_order, available, unit, category, version";

const LINE_ITEM_COLUMNS: &str = "id, order_id, kind, item_id, notes, detail, created_at";

const MOVEMENT_COLUMNS: &str = "id, item_id, kind, axis, amount, order_id, occurred_at, actor, notes";

/// Postgres implementation of [`InventoryStore`].
#[derive(Debug, Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub async fn connect(database_url: &str, lock_timeout: Duration) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool, lock_timeout))
    }

    /// Apply the bundled schema. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn line_items_for(&self, order_id: OrderId) -> Result<Vec<LineItem>, StoreError> {
        let sql = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM order_line_items WHERE order_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("line_items", e))?;
        rows.iter().map(decode_line_item).collect()
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    type Tx = PgStoreTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // SET does not accept bind parameters; the value is an integer we format ourselves.
        let set_timeout = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        sqlx::query(&set_timeout)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_lock_timeout", e))?;

        Ok(PgStoreTx { tx })
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderView>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = decode_order(&row)?;
        let line_items = self.line_items_for(id).await?;
        Ok(Some(OrderView { order, line_items }))
    }

    async fn get_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;
        row.as_ref().map(decode_item).transpose()
    }

    async fn movements_for_item(&self, id: InventoryItemId) -> Result<Vec<InventoryMovement>, StoreError> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE item_id = $1 ORDER BY seq");
        let rows = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("movements_for_item", e))?;
        rows.iter().map(decode_movement).collect()
    }

    async fn movements_for_order(&self, id: OrderId) -> Result<Vec<InventoryMovement>, StoreError> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE order_id = $1 ORDER BY seq");
        let rows = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("movements_for_order", e))?;
        rows.iter().map(decode_movement).collect()
    }

    async fn orders_created_before(
        &self,
        states: &[OrderState],
        created_before: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, StoreError> {
        let states: Vec<String> = states.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query(
            "SELECT id FROM orders WHERE state = ANY($1) AND created_at < $2 ORDER BY id",
        )
        .bind(&states)
        .bind(created_before)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("orders_created_before", e))?;
        decode_ids(&rows)
    }

    async fn completed_orders_with_panels(
        &self,
        completed_before: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT o.id
            FROM orders o
            WHERE o.state = 'completed'
              AND o.completed_at < $1
              AND EXISTS (
                  SELECT 1 FROM order_line_items li
                  WHERE li.order_id = o.id AND li.kind = 'panel'
              )
            ORDER BY o.id
            "#,
        )
        .bind(completed_before)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("completed_orders_with_panels", e))?;
        decode_ids(&rows)
    }
}

/// Open Postgres transaction. Dropping it rolls back.
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_order", e))?;
        row.as_ref().map(decode_order).transpose()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let row = order.snapshot();
        sqlx::query(
            r#"
            INSERT INTO orders (id, client_ref, state, priority, created_at, updated_at, completed_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(row.id.as_uuid())
        .bind(&row.client_ref)
        .bind(row.state.as_str())
        .bind(row.priority.as_str())
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.completed_at)
        .bind(row.version as i64)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let row = order.snapshot();
        let prior = row.version.saturating_sub(1) as i64;
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET state = $2, priority = $3, updated_at = $4, completed_at = $5, version = $6
            WHERE id = $1 AND version = $7
            "#,
        )
        .bind(row.id.as_uuid())
        .bind(row.state.as_str())
        .bind(row.priority.as_str())
        .bind(row.updated_at)
        .bind(row.completed_at)
        .bind(row.version as i64)
        .bind(prior)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "order {} is not at version {prior}",
                order.id()
            )));
        }
        Ok(())
    }

    async fn line_items(&mut self, order_id: OrderId) -> Result<Vec<LineItem>, StoreError> {
        let sql = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM order_line_items WHERE order_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(order_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("line_items", e))?;
        rows.iter().map(decode_line_item).collect()
    }

    async fn insert_line_item(&mut self, item: &LineItem) -> Result<(), StoreError> {
        let detail = serde_json::to_value(&item.detail)
            .map_err(|e| StoreError::Backend(format!("line item detail serialization failed: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO order_line_items (id, order_id, kind, item_id, quantity, notes, detail, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.kind.as_str())
        .bind(item.item_id.as_uuid())
        .bind(item.quantity().value())
        .bind(item.notes.as_deref())
        .bind(&detail)
        .bind(item.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_line_item", e))?;
        Ok(())
    }

    async fn delete_line_items(&mut self, order_id: OrderId, kind: LineItemKind) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM order_line_items WHERE order_id = $1 AND kind = $2")
            .bind(order_id.as_uuid())
            .bind(kind.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_line_items", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn lock_item(&mut self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_item", e))?;
        row.as_ref().map(decode_item).transpose()
    }

    async fn insert_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        let row = ItemColumns::from(item);
        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, kind, name, length_mm, width_mm, quality, location, unit_price,
                source_panel, origin_order, available, unit, category, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(row.id)
        .bind(row.kind)
        .bind(row.name)
        .bind(row.length_mm)
        .bind(row.width_mm)
        .bind(row.quality)
        .bind(row.location)
        .bind(row.unit_price)
        .bind(row.source_panel)
        .bind(row.origin_order)
        .bind(row.available)
        .bind(row.unit)
        .bind(row.category)
        .bind(row.version)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(())
    }

    async fn update_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        let row = ItemColumns::from(item);
        let result = sqlx::query(
            r#"
            UPDATE inventory_items
            SET length_mm = $2, width_mm = $3, quality = $4, available = $5, version = $6
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(row.length_mm)
        .bind(row.width_mm)
        .bind(row.quality)
        .bind(row.available)
        .bind(row.version)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("inventory item {}", row.id)));
        }
        Ok(())
    }

    async fn append_movement(&mut self, movement: &InventoryMovement) -> Result<(), StoreError> {
        let (axis, amount) = match movement.delta {
            MovementDelta::Dimension { axis, amount } => (Some(axis.as_str()), amount.as_mm()),
            MovementDelta::Quantity { amount } => (None, amount.value()),
        };
        sqlx::query(
            r#"
            INSERT INTO inventory_movements (id, item_id, kind, axis, amount, order_id, occurred_at, actor, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(movement.id.as_uuid())
        .bind(movement.item_id.as_uuid())
        .bind(movement.kind.as_str())
        .bind(axis)
        .bind(amount)
        .bind(movement.order_id.map(|id| *id.as_uuid()))
        .bind(movement.occurred_at)
        .bind(movement.actor.to_string())
        .bind(movement.notes.as_deref())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_movement", e))?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("55P03") => StoreError::LockTimeout(msg),
                Some("40001") | Some("40P01") | Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::RowNotFound => StoreError::NotFound(format!("row not found in {operation}")),
        other => {
            debug!(operation, error = %other, "unclassified sqlx error");
            StoreError::Backend(format!("sqlx error in {operation}: {other}"))
        }
    }
}

fn domain_decode(what: &str, err: DomainError) -> StoreError {
    StoreError::Backend(format!("failed to decode {what} row: {err}"))
}

fn decode_ids(rows: &[PgRow]) -> Result<Vec<OrderId>, StoreError> {
    rows.iter()
        .map(|row| {
            row.try_get::<uuid::Uuid, _>("id")
                .map(OrderId::from_uuid)
                .map_err(|e| StoreError::Backend(format!("failed to read id: {e}")))
        })
        .collect()
}

// SQLx row types

#[derive(Debug)]
struct OrderRow {
    id: uuid::Uuid,
    client_ref: String,
    state: String,
    priority: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    version: i64,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            client_ref: row.try_get("client_ref")?,
            state: row.try_get("state")?,
            priority: row.try_get("priority")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            completed_at: row.try_get("completed_at")?,
            version: row.try_get("version")?,
        })
    }
}

fn decode_order(row: &PgRow) -> Result<Order, StoreError> {
    let r = OrderRow::from_row(row).map_err(|e| map_sqlx_error("decode_order", e))?;
    Ok(Order::from_snapshot(OrderSnapshot {
        id: OrderId::from_uuid(r.id),
        client_ref: r.client_ref,
        state: r.state.parse().map_err(|e| domain_decode("order", e))?,
        priority: r.priority.parse().map_err(|e| domain_decode("order", e))?,
        created_at: r.created_at,
        updated_at: r.updated_at,
        completed_at: r.completed_at,
        version: r.version as u64,
    }))
}

#[derive(Debug)]
struct LineItemRow {
    id: uuid::Uuid,
    order_id: uuid::Uuid,
    kind: String,
    item_id: uuid::Uuid,
    notes: Option<String>,
    detail: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for LineItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LineItemRow {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            kind: row.try_get("kind")?,
            item_id: row.try_get("item_id")?,
            notes: row.try_get("notes")?,
            detail: row.try_get("detail")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn decode_line_item(row: &PgRow) -> Result<LineItem, StoreError> {
    let r = LineItemRow::from_row(row).map_err(|e| map_sqlx_error("decode_line_item", e))?;
    Ok(LineItem {
        id: panelstock_core::LineItemId::from_uuid(r.id),
        order_id: OrderId::from_uuid(r.order_id),
        kind: r.kind.parse().map_err(|e| domain_decode("line item", e))?,
        item_id: InventoryItemId::from_uuid(r.item_id),
        notes: r.notes,
        detail: serde_json::from_value(r.detail)
            .map_err(|e| StoreError::Backend(format!("failed to decode line item detail: {e}")))?,
        created_at: r.created_at,
    })
}

/// Flat column view of an inventory row, shared by insert, update and decode.
#[derive(Debug)]
struct ItemColumns {
    id: uuid::Uuid,
    kind: String,
    name: String,
    length_mm: Option<i64>,
    width_mm: Option<i64>,
    quality: Option<String>,
    location: Option<String>,
    unit_price: Option<i64>,
    source_panel: Option<uuid::Uuid>,
    origin_order: Option<uuid::Uuid>,
    available: Option<i64>,
    unit: Option<String>,
    category: Option<String>,
    version: i64,
}

impl From<&InventoryItem> for ItemColumns {
    fn from(item: &InventoryItem) -> Self {
        match item {
            InventoryItem::Panel(p) => ItemColumns {
                id: *p.item_id().as_uuid(),
                kind: item.catalog_type().to_string(),
                name: p.material_type().to_string(),
                length_mm: Some(p.length().as_mm()),
                width_mm: Some(p.width().as_mm()),
                quality: Some(p.quality().as_str().to_string()),
                location: Some(p.location().to_string()),
                unit_price: Some(p.unit_price()),
                source_panel: p.source_panel().map(|id| *id.as_uuid()),
                origin_order: p.origin_order().map(|id| *id.as_uuid()),
                available: None,
                unit: None,
                category: None,
                version: p.version() as i64,
            },
            InventoryItem::Stock(s) => ItemColumns {
                id: *s.item_id().as_uuid(),
                kind: item.catalog_type().to_string(),
                name: s.name().to_string(),
                length_mm: None,
                width_mm: None,
                quality: None,
                location: None,
                unit_price: None,
                source_panel: None,
                origin_order: None,
                available: Some(s.available().value()),
                unit: Some(s.unit().to_string()),
                category: Some(s.category().to_string()),
                version: s.version() as i64,
            },
        }
    }
}

impl<'r> FromRow<'r, PgRow> for ItemColumns {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemColumns {
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            name: row.try_get("name")?,
            length_mm: row.try_get("length_mm")?,
            width_mm: row.try_get("width_mm")?,
            quality: row.try_get("quality")?,
            location: row.try_get("location")?,
            unit_price: row.try_get("unit_price")?,
            source_panel: row.try_get("source_panel")?,
            origin_order: row.try_get("origin_order")?,
            available: row.try_get("available")?,
            unit: row.try_get("unit")?,
            category: row.try_get("category")?,
            version: row.try_get("version")?,
        })
    }
}

fn decode_item(row: &PgRow) -> Result<InventoryItem, StoreError> {
    let r = ItemColumns::from_row(row).map_err(|e| map_sqlx_error("decode_item", e))?;
    let id = InventoryItemId::from_uuid(r.id);
    let missing = |column: &str| StoreError::Backend(format!("inventory item {id} has no {column}"));

    let item = if r.kind == "panel" {
        let quality = r.quality.ok_or_else(|| missing("quality"))?;
        Panel::new(NewPanel {
            id,
            material_type: r.name,
            length: Length::from_mm(r.length_mm.ok_or_else(|| missing("length_mm"))?),
            width: Length::from_mm(r.width_mm.ok_or_else(|| missing("width_mm"))?),
            quality: quality.parse().map_err(|e| domain_decode("panel", e))?,
            location: r.location.unwrap_or_default(),
            unit_price: r.unit_price.unwrap_or(0),
            source_panel: r.source_panel.map(InventoryItemId::from_uuid),
            origin_order: r.origin_order.map(OrderId::from_uuid),
        })
        .map(|p| p.with_version(r.version as u64))
        .map(InventoryItem::Panel)
    } else {
        StockItem::new(NewStockItem {
            id,
            kind: r.kind.parse().map_err(|e| domain_decode("stock item", e))?,
            name: r.name,
            available: Quantity::new(r.available.ok_or_else(|| missing("available"))?),
            unit: r.unit.unwrap_or_default(),
            category: r.category.unwrap_or_default(),
        })
        .map(|s| s.with_version(r.version as u64))
        .map(InventoryItem::Stock)
    };
    item.map_err(|e| domain_decode("inventory item", e))
}

#[derive(Debug)]
struct MovementRow {
    id: uuid::Uuid,
    item_id: uuid::Uuid,
    kind: String,
    axis: Option<String>,
    amount: i64,
    order_id: Option<uuid::Uuid>,
    occurred_at: DateTime<Utc>,
    actor: String,
    notes: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for MovementRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            id: row.try_get("id")?,
            item_id: row.try_get("item_id")?,
            kind: row.try_get("kind")?,
            axis: row.try_get("axis")?,
            amount: row.try_get("amount")?,
            order_id: row.try_get("order_id")?,
            occurred_at: row.try_get("occurred_at")?,
            actor: row.try_get("actor")?,
            notes: row.try_get("notes")?,
        })
    }
}

fn decode_movement(row: &PgRow) -> Result<InventoryMovement, StoreError> {
    let r = MovementRow::from_row(row).map_err(|e| map_sqlx_error("decode_movement", e))?;
    let delta = match r.axis {
        Some(axis) => MovementDelta::dimension(
            axis.parse::<Axis>().map_err(|e| domain_decode("movement", e))?,
            Length::from_mm(r.amount),
        ),
        None => MovementDelta::quantity(Quantity::new(r.amount)),
    };
    Ok(InventoryMovement {
        id: panelstock_core::MovementId::from_uuid(r.id),
        item_id: InventoryItemId::from_uuid(r.item_id),
        kind: r.kind.parse().map_err(|e| domain_decode("movement", e))?,
        delta,
        order_id: r.order_id.map(OrderId::from_uuid),
        occurred_at: r.occurred_at,
        actor: r.actor.parse().map_err(|e| domain_decode("movement", e))?,
        notes: r.notes,
    })
}
