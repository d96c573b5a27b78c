//! Order service: creation, line-item allocation and lifecycle transitions.
//!
//! Every mutating call runs in one store transaction that locks the order row first and
//! then inventory rows in ascending id order. Transient lock and serialization failures
//! re-run the whole transaction under the configured [`RetryPolicy`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use panelstock_core::{Actor, AggregateRoot, Area, DomainError, InventoryItemId, Length, OrderId};
use panelstock_cutting::{compute_cut_plan, CutPlan, CutSpecification};
use panelstock_inventory::{
    Axis, Balance, InventoryItem, InventoryMovement, MovementDelta, MovementKind, Panel, StockItem,
};
use panelstock_orders::{
    AddLineItems, ChangeOrderState, CreateDraft, CreateOrder, LineItem, LineItemKind, LineItemRequest, Order, OrderView,
    TransitionEffect,
};

use crate::compensation;
use crate::error::ServiceError;
use crate::ledger;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::{InventoryStore, StoreTx};

/// Application service for production orders.
pub struct OrderService<S: InventoryStore> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S: InventoryStore> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            retry: self.retry.clone(),
        }
    }
}

impl<S: InventoryStore> OrderService<S> {
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Create a `Pending` order, allocating every line item against inventory.
    #[instrument(skip(self, cmd), fields(order_id = %cmd.order_id, client_ref = %cmd.client_ref))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<OrderView, ServiceError> {
        // Header validation needs no store access.
        Order::create(&cmd)?;
        let cmd = &cmd;
        let view = with_retry(&self.retry, "create_order", move || self.try_create_order(cmd)).await?;
        info!(
            line_items = view.line_items.len(),
            priority = view.order.priority().as_str(),
            "order created"
        );
        Ok(view)
    }

    async fn try_create_order(&self, cmd: &CreateOrder) -> Result<OrderView, ServiceError> {
        let order = Order::create(cmd)?;
        let mut tx = self.store.begin().await?;
        tx.insert_order(&order).await?;
        let line_items = allocate(&mut tx, *order.id(), &cmd.line_items, &cmd.actor, cmd.occurred_at).await?;
        tx.commit().await?;
        Ok(OrderView { order, line_items })
    }

    /// Record a `Draft` order header. Nothing is allocated until the draft is moved to
    /// `Pending` and line items are added.
    #[instrument(skip(self, cmd), fields(order_id = %cmd.order_id, client_ref = %cmd.client_ref, actor = %cmd.actor))]
    pub async fn create_draft(&self, cmd: CreateDraft) -> Result<Order, ServiceError> {
        let order = Order::draft(&cmd)?;
        let order = &order;
        with_retry(&self.retry, "create_draft", move || async move {
            let mut tx = self.store.begin().await?;
            tx.insert_order(order).await?;
            tx.commit().await?;
            Ok::<_, ServiceError>(())
        })
        .await?;
        info!(priority = order.priority().as_str(), "draft order created");
        Ok(order.clone())
    }

    /// Apply a lifecycle transition; a move into `Cancelled` compensates in the same
    /// transaction.
    #[instrument(skip(self, cmd), fields(order_id = %cmd.order_id, target = %cmd.target, actor = %cmd.actor))]
    pub async fn change_state(&self, cmd: ChangeOrderState) -> Result<Order, ServiceError> {
        let cmd = &cmd;
        with_retry(&self.retry, "change_state", move || self.try_change_state(cmd)).await
    }

    async fn try_change_state(&self, cmd: &ChangeOrderState) -> Result<Order, ServiceError> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_order(cmd.order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("order {}", cmd.order_id)))?;

        let from = order.state();
        let effect = order.transition(cmd.target, cmd.occurred_at)?;
        if effect == TransitionEffect::Compensate {
            compensation::compensate(&mut tx, &order, &cmd.actor, cmd.occurred_at).await?;
        }
        tx.update_order(&order).await?;
        tx.commit().await?;

        info!(from = %from, to = %order.state(), version = order.version(), "order state changed");
        Ok(order)
    }

    /// Allocate more line items to an order that is still open.
    #[instrument(skip(self, cmd), fields(order_id = %cmd.order_id, actor = %cmd.actor))]
    pub async fn add_line_items(&self, cmd: AddLineItems) -> Result<OrderView, ServiceError> {
        if cmd.line_items.is_empty() {
            return Err(DomainError::validation("no line items to add").into());
        }
        let cmd = &cmd;
        with_retry(&self.retry, "add_line_items", move || self.try_add_line_items(cmd)).await
    }

    async fn try_add_line_items(&self, cmd: &AddLineItems) -> Result<OrderView, ServiceError> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .lock_order(cmd.order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("order {}", cmd.order_id)))?;
        order.ensure_accepts_line_items()?;

        let mut line_items = tx.line_items(cmd.order_id).await?;
        let added = allocate(&mut tx, cmd.order_id, &cmd.line_items, &cmd.actor, cmd.occurred_at).await?;
        order.touch(cmd.occurred_at);
        tx.update_order(&order).await?;
        tx.commit().await?;

        info!(added = added.len(), version = order.version(), "line items added");
        line_items.extend(added);
        Ok(OrderView { order, line_items })
    }

    /// Plan `specification` against the current dimensions of a panel without
    /// reserving anything.
    #[instrument(skip(self, specification))]
    pub async fn compute_cut_plan(
        &self,
        panel_id: InventoryItemId,
        specification: &CutSpecification,
        remnant_threshold: Area,
    ) -> Result<CutPlan, ServiceError> {
        let item = self
            .store
            .get_item(panel_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("panel {panel_id}")))?;
        let panel = expect_panel(&item)?;
        Ok(compute_cut_plan(panel.length(), panel.width(), specification, remnant_threshold)?)
    }

    pub async fn get_order(&self, id: OrderId) -> Result<OrderView, ServiceError> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("order {id}")))
    }

    pub async fn movements_for_item(&self, id: InventoryItemId) -> Result<Vec<InventoryMovement>, ServiceError> {
        Ok(self.store.movements_for_item(id).await?)
    }

    pub async fn movements_for_order(&self, id: OrderId) -> Result<Vec<InventoryMovement>, ServiceError> {
        Ok(self.store.movements_for_order(id).await?)
    }
}

/// Lock every referenced item, then allocate each request in order and stage its line
/// item and movements.
async fn allocate<T: StoreTx>(
    tx: &mut T,
    order_id: OrderId,
    requests: &[LineItemRequest],
    actor: &Actor,
    at: DateTime<Utc>,
) -> Result<Vec<LineItem>, ServiceError> {
    let ids: BTreeSet<InventoryItemId> = requests.iter().map(LineItemRequest::item_id).collect();
    let mut locked: BTreeMap<InventoryItemId, InventoryItem> = BTreeMap::new();
    for id in ids {
        let item = tx
            .lock_item(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("inventory item {id}")))?;
        locked.insert(id, item);
    }

    let mut line_items = Vec::with_capacity(requests.len());
    for request in requests {
        let item = locked
            .get_mut(&request.item_id())
            .ok_or_else(|| DomainError::invariant(format!("inventory item {} was not locked", request.item_id())))?;
        let notes = request.notes().map(str::to_string);

        let line_item = match request {
            LineItemRequest::Panel {
                panel_id,
                specification,
                remnant_threshold,
                ..
            } => {
                let source = expect_panel(item)?;
                if source.is_retired() {
                    return Err(DomainError::validation(format!("panel {panel_id} is retired")).into());
                }
                let plan = compute_cut_plan(source.length(), source.width(), specification, *remnant_threshold)?;
                debug!(
                    panel_id = %panel_id,
                    utilization = plan.utilization,
                    offcut_area = %plan.offcut_area(),
                    waste_area = %plan.waste_area(),
                    axis = %plan.axis_cut.axis,
                    "cut planned"
                );

                let mut remnant_panels = Vec::new();
                if let Some(rect) = plan.new_panel() {
                    // Remnant rows start with zero width so the AdjustIn accounts for their whole area.
                    let remnant = Panel::remnant_of(source, order_id, rect.length, Length::ZERO)?;
                    let mut remnant = InventoryItem::from(remnant);
                    tx.insert_item(&remnant).await?;
                    ledger::record(
                        tx,
                        &mut remnant,
                        MovementKind::AdjustIn,
                        MovementDelta::dimension(Axis::Width, rect.width),
                        Some(order_id),
                        actor,
                        Some(&format!("remnant of panel {panel_id}")),
                        at,
                    )
                    .await?;
                    remnant_panels.push(remnant.item_id());
                }

                ledger::record(
                    tx,
                    item,
                    MovementKind::Consume,
                    MovementDelta::dimension(plan.axis_cut.axis, plan.axis_cut.amount),
                    Some(order_id),
                    actor,
                    notes.as_deref(),
                    at,
                )
                .await?;

                LineItem::panel(
                    order_id,
                    *panel_id,
                    specification.clone(),
                    plan,
                    remnant_panels,
                    notes,
                    at,
                )
            }
            LineItemRequest::Material { item_id, quantity, .. } => {
                let stock = expect_stock(item, LineItemKind::Material)?;
                if stock.available() < *quantity {
                    return Err(DomainError::insufficient_stock(format!(
                        "material {item_id} has {} {}, {quantity} requested",
                        stock.available(),
                        stock.unit()
                    ))
                    .into());
                }
                let line_item = LineItem::stock(order_id, LineItemKind::Material, *item_id, *quantity, notes, at)?;
                ledger::record(
                    tx,
                    item,
                    MovementKind::Consume,
                    MovementDelta::quantity(*quantity),
                    Some(order_id),
                    actor,
                    line_item.notes.as_deref(),
                    at,
                )
                .await?;
                line_item
            }
            LineItemRequest::Tool { item_id, quantity, .. } => {
                expect_stock(item, LineItemKind::Tool)?;
                let line_item = LineItem::stock(order_id, LineItemKind::Tool, *item_id, *quantity, notes, at)?;
                ledger::record(
                    tx,
                    item,
                    MovementKind::Assign,
                    MovementDelta::quantity(*quantity),
                    Some(order_id),
                    actor,
                    line_item.notes.as_deref(),
                    at,
                )
                .await?;
                line_item
            }
        };

        tx.insert_line_item(&line_item).await?;
        line_items.push(line_item);
    }
    Ok(line_items)
}

fn expect_panel(item: &InventoryItem) -> Result<&Panel, DomainError> {
    item.as_panel().ok_or_else(|| {
        DomainError::validation(format!(
            "panel line item references {} {}",
            item.catalog_type(),
            item.item_id()
        ))
    })
}

fn expect_stock(item: &InventoryItem, line_kind: LineItemKind) -> Result<&StockItem, DomainError> {
    match item.as_stock() {
        Some(stock) if line_kind.stock_kind() == Some(stock.kind()) => Ok(stock),
        _ => Err(DomainError::validation(format!(
            "{line_kind} line item references {} {}",
            item.catalog_type(),
            item.item_id()
        ))),
    }
}
