//! End-to-end tests for the allocation and order-lifecycle pipeline.
//!
//! Tests: OrderService → InventoryStore (in-memory) → ledger → compensation → housekeeping
//!
//! Verifies:
//! - Cuts and cancellations restore panels to their exact dimensions
//! - Cancellation compensates exactly once
//! - Failures leave no partial state behind
//! - Concurrent allocations never over-reserve

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};

    use panelstock_core::{Actor, AggregateRoot, Area, DomainError, InventoryItemId, Length, OrderId, Quantity, UserId};
    use panelstock_cutting::{CutRequest, CutSpecification};
    use panelstock_inventory::{
        replay, Axis, Balance, InventoryItem, MovementDelta, MovementKind, NewPanel, NewStockItem, Panel,
        QualityState, StockItem, StockKind,
    };
    use panelstock_orders::{
        AddLineItems, ChangeOrderState, CreateDraft, CreateOrder, LineItemKind, LineItemRequest, Order, OrderState, Priority,
    };

    use crate::config::HousekeepingConfig;
    use crate::error::ServiceError;
    use crate::housekeeping::{HousekeepingJob, HousekeepingScheduler, HOUSEKEEPING_ACTOR};
    use crate::orders::OrderService;
    use crate::retry::RetryPolicy;
    use crate::store::{InMemoryStore, InventoryStore, StoreTx};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn mm(v: i64) -> Length {
        Length::from_mm(v)
    }

    fn clerk() -> Actor {
        Actor::User(UserId::new())
    }

    fn setup_with(retry: RetryPolicy) -> (Arc<InMemoryStore>, OrderService<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new(Duration::from_secs(2)));
        let service = OrderService::new(store.clone(), retry);
        (store, service)
    }

    fn setup() -> (Arc<InMemoryStore>, OrderService<InMemoryStore>) {
        setup_with(RetryPolicy::fixed(3, Duration::from_millis(1)))
    }

    fn panel(length_mm: i64, width_mm: i64) -> Panel {
        Panel::new(NewPanel {
            id: InventoryItemId::new(),
            material_type: "knotless-nylon".to_string(),
            length: mm(length_mm),
            width: mm(width_mm),
            quality: QualityState::Good,
            location: "rack-a".to_string(),
            unit_price: 1_250,
            source_panel: None,
            origin_order: None,
        })
        .unwrap()
    }

    fn stock(kind: StockKind, units: i64) -> StockItem {
        StockItem::new(NewStockItem {
            id: InventoryItemId::new(),
            kind,
            name: format!("{} stock", kind.as_str()),
            available: Quantity::new(units),
            unit: "pc".to_string(),
            category: "general".to_string(),
        })
        .unwrap()
    }

    async fn seed(store: &InMemoryStore, item: impl Into<InventoryItem>) -> InventoryItemId {
        let item = item.into();
        let id = item.item_id();
        let mut tx = store.begin().await.unwrap();
        tx.insert_item(&item).await.unwrap();
        tx.commit().await.unwrap();
        id
    }

    fn cut(panel_id: InventoryItemId, length_mm: i64, width_mm: i64, threshold_m2: f64) -> LineItemRequest {
        LineItemRequest::Panel {
            panel_id,
            specification: CutSpecification::new(vec![CutRequest::new(mm(length_mm), mm(width_mm), 1)]).unwrap(),
            remnant_threshold: Area::from_square_metres(threshold_m2),
            notes: None,
        }
    }

    fn create(line_items: Vec<LineItemRequest>, at: DateTime<Utc>) -> CreateOrder {
        CreateOrder {
            order_id: OrderId::new(),
            client_ref: "HARBOUR-114".to_string(),
            priority: Priority::Normal,
            line_items,
            actor: clerk(),
            occurred_at: at,
        }
    }

    async fn change(
        service: &OrderService<InMemoryStore>,
        order_id: OrderId,
        target: OrderState,
        at: DateTime<Utc>,
    ) -> Result<Order, ServiceError> {
        service
            .change_state(ChangeOrderState {
                order_id,
                target,
                actor: clerk(),
                occurred_at: at,
            })
            .await
    }

    async fn item(store: &InMemoryStore, id: InventoryItemId) -> InventoryItem {
        store.get_item(id).await.unwrap().unwrap()
    }

    async fn dims(store: &InMemoryStore, id: InventoryItemId) -> (Length, Length) {
        let item = item(store, id).await;
        let p = item.as_panel().unwrap();
        (p.length(), p.width())
    }

    async fn compensating_adjust_ins(service: &OrderService<InMemoryStore>, order_id: OrderId) -> usize {
        service
            .movements_for_order(order_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.kind == MovementKind::AdjustIn)
            .filter(|m| m.notes.as_deref().is_some_and(|n| n.starts_with("compensation")))
            .count()
    }

    fn housekeeping(service: &OrderService<InMemoryStore>) -> HousekeepingScheduler<InMemoryStore> {
        HousekeepingScheduler::new(
            service.clone(),
            HousekeepingConfig {
                retry: RetryPolicy::no_retry(),
                ..HousekeepingConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn cut_reinserts_remnant_and_cancel_restores_exact_dimensions() {
        let (store, service) = setup();
        let original = panel(10_000, 5_000);
        let panel_id = seed(&store, original.clone()).await;

        let view = service
            .create_order(create(vec![cut(panel_id, 3_000, 2_000, 0.5)], t0()))
            .await
            .unwrap();
        assert_eq!(view.order.state(), OrderState::Pending);
        assert_eq!(view.order.version(), 1);

        let li = &view.line_items[0];
        let consumed = li.consumed().unwrap();
        assert_eq!((consumed.axis, consumed.amount), (Axis::Length, mm(3_000)));
        assert_eq!(li.waste_area(), Area::ZERO);
        assert_eq!(dims(&store, panel_id).await, (mm(7_000), mm(5_000)));

        let remnant_id = li.remnant_panels()[0];
        let remnant = item(&store, remnant_id).await;
        let remnant = remnant.as_panel().unwrap();
        assert_eq!((remnant.length(), remnant.width()), (mm(3_000), mm(3_000)));
        assert_eq!(remnant.quality(), QualityState::Remnant);
        assert_eq!(remnant.source_panel(), Some(panel_id));
        assert_eq!(remnant.origin_order(), Some(*view.order.id()));

        let order_id = *view.order.id();
        let cancelled = change(&service, order_id, OrderState::Cancelled, t0()).await.unwrap();
        assert_eq!(cancelled.state(), OrderState::Cancelled);

        // Exact, per-dimension restoration.
        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));

        let retired = item(&store, remnant_id).await;
        let retired = retired.as_panel().unwrap();
        assert!(retired.is_retired());
        assert_eq!(retired.area(), Area::ZERO);

        let stored = service.get_order(order_id).await.unwrap();
        assert_eq!(stored.panel_items().count(), 0);

        // The ledger alone re-derives the live balance.
        let movements = service.movements_for_item(panel_id).await.unwrap();
        let kinds: Vec<_> = movements.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MovementKind::Consume, MovementKind::AdjustIn]);
        let rebuilt = replay(&original, &movements).unwrap();
        assert_eq!((rebuilt.length(), rebuilt.width()), (mm(10_000), mm(5_000)));
    }

    #[tokio::test]
    async fn second_cancellation_is_rejected_without_double_credit() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;
        let view = service
            .create_order(create(vec![cut(panel_id, 3_000, 5_000, 0.5)], t0()))
            .await
            .unwrap();
        let order_id = *view.order.id();

        change(&service, order_id, OrderState::Cancelled, t0()).await.unwrap();
        let err = change(&service, order_id, OrderState::Cancelled, t0()).await.unwrap_err();
        assert_eq!(err.code(), "invalid_transition");

        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));
        let adjust_ins = service
            .movements_for_order(order_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.kind == MovementKind::AdjustIn)
            .count();
        assert_eq!(adjust_ins, 1);
    }

    #[tokio::test]
    async fn stale_in_progress_order_is_auto_cancelled_after_thirty_days() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;
        let fresh_panel = seed(&store, panel(4_000, 2_000)).await;

        let stale = service
            .create_order(create(vec![cut(panel_id, 3_000, 5_000, 0.5)], t0()))
            .await
            .unwrap();
        let stale_id = *stale.order.id();
        change(&service, stale_id, OrderState::InProgress, t0()).await.unwrap();

        let recent_at = t0() + chrono::Duration::days(10);
        let recent = service
            .create_order(create(vec![cut(fresh_panel, 1_000, 2_000, 0.5)], recent_at))
            .await
            .unwrap();
        let recent_id = *recent.order.id();
        change(&service, recent_id, OrderState::InProgress, recent_at).await.unwrap();

        let scheduler = housekeeping(&service);
        let reports = scheduler.run_once(t0() + chrono::Duration::days(31)).await;

        let auto_cancel = reports.iter().find(|r| r.job == HousekeepingJob::AutoCancel).unwrap();
        assert_eq!((auto_cancel.examined, auto_cancel.affected), (1, 1));

        let stale = service.get_order(stale_id).await.unwrap();
        assert_eq!(stale.order.state(), OrderState::Cancelled);
        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));

        let compensating: Vec<_> = service
            .movements_for_order(stale_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.kind == MovementKind::AdjustIn)
            .collect();
        assert_eq!(compensating.len(), 1);
        assert_eq!(compensating[0].order_id, Some(stale_id));
        assert_eq!(compensating[0].actor, Actor::system(HOUSEKEEPING_ACTOR));
        assert_eq!(compensating[0].delta, MovementDelta::dimension(Axis::Length, mm(3_000)));

        let recent = service.get_order(recent_id).await.unwrap();
        assert_eq!(recent.order.state(), OrderState::InProgress);

        // A second sweep finds nothing left to do.
        let again = scheduler.run_once(t0() + chrono::Duration::days(31)).await;
        assert!(again.iter().all(|r| r.affected == 0));
        assert_eq!(scheduler.stats().orders_cancelled, 1);
    }

    #[tokio::test]
    async fn pending_orders_are_not_auto_cancelled() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(2_000, 2_000)).await;
        let view = service
            .create_order(create(vec![cut(panel_id, 1_000, 1_000, 0.0)], t0()))
            .await
            .unwrap();

        housekeeping(&service).run_once(t0() + chrono::Duration::days(90)).await;
        let view = service.get_order(*view.order.id()).await.unwrap();
        assert_eq!(view.order.state(), OrderState::Pending);
    }

    #[tokio::test]
    async fn purge_keeps_completed_panel_items_inside_the_retention_window() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(6_000, 3_000)).await;
        let twine = seed(&store, stock(StockKind::Material, 40)).await;

        let view = service
            .create_order(create(
                vec![
                    cut(panel_id, 2_000, 3_000, 0.5),
                    LineItemRequest::Material {
                        item_id: twine,
                        quantity: Quantity::new(4),
                        notes: Some("lacing".to_string()),
                    },
                ],
                t0(),
            ))
            .await
            .unwrap();
        let order_id = *view.order.id();
        change(&service, order_id, OrderState::InProgress, t0()).await.unwrap();
        let completed = change(&service, order_id, OrderState::Completed, t0()).await.unwrap();
        assert_eq!(completed.completed_at(), Some(t0()));

        let movements_before = service.movements_for_order(order_id).await.unwrap();
        let scheduler = housekeeping(&service);

        scheduler.run_once(t0() + chrono::Duration::days(2)).await;
        assert_eq!(service.get_order(order_id).await.unwrap().panel_items().count(), 1);

        let reports = scheduler.run_once(t0() + chrono::Duration::days(4)).await;
        let purge = reports.iter().find(|r| r.job == HousekeepingJob::PurgeCompleted).unwrap();
        assert_eq!(purge.affected, 1);

        let after = service.get_order(order_id).await.unwrap();
        assert_eq!(after.order.state(), OrderState::Completed);
        assert_eq!(after.panel_items().count(), 0);
        assert_eq!(after.line_items.len(), 1);
        assert_eq!(after.line_items[0].kind, LineItemKind::Material);
        assert_eq!(service.movements_for_order(order_id).await.unwrap(), movements_before);
        // Purging does not give the panel back.
        assert_eq!(dims(&store, panel_id).await, (mm(4_000), mm(3_000)));

        let again = scheduler.run_once(t0() + chrono::Duration::days(5)).await;
        let purge = again.iter().find(|r| r.job == HousekeepingJob::PurgeCompleted).unwrap();
        assert_eq!(purge.examined, 0);
    }

    #[tokio::test]
    async fn remnant_cut_by_another_order_survives_cancellation() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;

        let first = service
            .create_order(create(vec![cut(panel_id, 3_000, 2_000, 0.5)], t0()))
            .await
            .unwrap();
        let remnant_id = first.line_items[0].remnant_panels()[0];

        service
            .create_order(create(vec![cut(remnant_id, 1_000, 1_000, 0.0)], t0()))
            .await
            .unwrap();
        assert_eq!(dims(&store, remnant_id).await, (mm(2_000), mm(3_000)));

        change(&service, *first.order.id(), OrderState::Cancelled, t0()).await.unwrap();

        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));
        let remnant = item(&store, remnant_id).await;
        let remnant = remnant.as_panel().unwrap();
        assert_eq!(remnant.quality(), QualityState::Remnant);
        assert_eq!((remnant.length(), remnant.width()), (mm(2_000), mm(3_000)));
    }

    #[tokio::test]
    async fn same_order_recut_of_its_own_remnant_is_fully_undone() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;

        let view = service
            .create_order(create(vec![cut(panel_id, 3_000, 2_000, 0.5)], t0()))
            .await
            .unwrap();
        let order_id = *view.order.id();
        let remnant_id = view.line_items[0].remnant_panels()[0];

        let added = service
            .add_line_items(AddLineItems {
                order_id,
                line_items: vec![cut(remnant_id, 1_000, 1_000, 0.5)],
                actor: clerk(),
                occurred_at: t0(),
            })
            .await
            .unwrap();
        let second_remnant = added.line_items[1].remnant_panels()[0];
        assert_eq!(dims(&store, remnant_id).await, (mm(2_000), mm(3_000)));
        assert_eq!(dims(&store, second_remnant).await, (mm(1_000), mm(2_000)));

        change(&service, order_id, OrderState::Cancelled, t0()).await.unwrap();

        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));
        for id in [remnant_id, second_remnant] {
            let remnant = item(&store, id).await;
            let remnant = remnant.as_panel().unwrap();
            assert!(remnant.is_retired(), "remnant {id} left in stock");
            assert_eq!(remnant.area(), Area::ZERO);
        }
        assert_eq!(compensating_adjust_ins(&service, order_id).await, 2);
    }

    #[tokio::test]
    async fn width_cut_is_restored_along_the_width() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;

        let view = service
            .create_order(create(vec![cut(panel_id, 10_000, 2_000, 0.5)], t0()))
            .await
            .unwrap();
        let consumed = view.line_items[0].consumed().unwrap();
        assert_eq!((consumed.axis, consumed.amount), (Axis::Width, mm(2_000)));
        assert!(view.line_items[0].remnant_panels().is_empty());
        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(3_000)));

        let order_id = *view.order.id();
        change(&service, order_id, OrderState::Cancelled, t0()).await.unwrap();
        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));

        let restores: Vec<_> = service
            .movements_for_order(order_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.kind == MovementKind::AdjustIn)
            .collect();
        assert_eq!(restores.len(), 1);
        assert_eq!(restores[0].delta, MovementDelta::dimension(Axis::Width, mm(2_000)));
    }

    #[tokio::test]
    async fn scrapped_primary_strip_consumes_and_restores_the_whole_axis() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;

        // The 500 x 5000 leftover is 2.5 m², below the 5 m² threshold.
        let view = service
            .create_order(create(vec![cut(panel_id, 9_500, 5_000, 5.0)], t0()))
            .await
            .unwrap();
        let li = &view.line_items[0];
        let consumed = li.consumed().unwrap();
        assert_eq!((consumed.axis, consumed.amount), (Axis::Length, mm(10_000)));
        assert_eq!(li.waste_area(), Area::from_square_metres(2.5));
        assert_eq!(dims(&store, panel_id).await, (Length::ZERO, mm(5_000)));

        let order_id = *view.order.id();
        change(&service, order_id, OrderState::Cancelled, t0()).await.unwrap();
        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));
        assert_eq!(compensating_adjust_ins(&service, order_id).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn manual_cancel_racing_auto_cancel_compensates_once() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;
        let view = service
            .create_order(create(vec![cut(panel_id, 3_000, 5_000, 0.5)], t0()))
            .await
            .unwrap();
        let order_id = *view.order.id();
        change(&service, order_id, OrderState::InProgress, t0()).await.unwrap();

        let now = t0() + chrono::Duration::days(31);
        let manual = {
            let service = service.clone();
            tokio::spawn(async move { change(&service, order_id, OrderState::Cancelled, now).await })
        };
        let sweep = {
            let scheduler = housekeeping(&service);
            tokio::spawn(async move { scheduler.run_once(now).await })
        };

        let manual = manual.await.unwrap();
        let reports = sweep.await.unwrap();
        let auto_cancel = reports.iter().find(|r| r.job == HousekeepingJob::AutoCancel).unwrap();
        assert_eq!(auto_cancel.failed, 0);

        let manual_won = match manual {
            Ok(order) => {
                assert_eq!(order.state(), OrderState::Cancelled);
                true
            }
            Err(e) => {
                assert_eq!(e.code(), "invalid_transition");
                false
            }
        };
        assert_eq!(manual_won as usize + auto_cancel.affected, 1);

        assert_eq!(service.get_order(order_id).await.unwrap().order.state(), OrderState::Cancelled);
        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));
        assert_eq!(compensating_adjust_ins(&service, order_id).await, 1);
    }

    #[tokio::test]
    async fn draft_orders_allocate_only_after_submission() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(6_000, 3_000)).await;
        let order_id = OrderId::new();

        let draft = service
            .create_draft(CreateDraft {
                order_id,
                client_ref: "HARBOUR-120".to_string(),
                priority: Priority::Low,
                actor: clerk(),
                occurred_at: t0(),
            })
            .await
            .unwrap();
        assert_eq!(draft.state(), OrderState::Draft);

        let add = |at| AddLineItems {
            order_id,
            line_items: vec![cut(panel_id, 2_000, 3_000, 0.5)],
            actor: clerk(),
            occurred_at: at,
        };
        let err = service.add_line_items(add(t0())).await.unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(dims(&store, panel_id).await, (mm(6_000), mm(3_000)));

        let err = change(&service, order_id, OrderState::Cancelled, t0()).await.unwrap_err();
        assert_eq!(err.code(), "invalid_transition");

        change(&service, order_id, OrderState::Pending, t0()).await.unwrap();
        let view = service.add_line_items(add(t0())).await.unwrap();
        assert_eq!(view.line_items.len(), 1);
        assert_eq!(view.order.version(), 3);
        assert_eq!(dims(&store, panel_id).await, (mm(4_000), mm(3_000)));
    }

    #[tokio::test]
    async fn failed_compensation_rolls_back_the_state_change() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;
        let view = service
            .create_order(create(vec![cut(panel_id, 3_000, 5_000, 0.5)], t0()))
            .await
            .unwrap();
        let order_id = *view.order.id();
        let movements_before = service.movements_for_order(order_id).await.unwrap();

        store.fail_movements_of_kind(Some(MovementKind::AdjustIn));
        let err = change(&service, order_id, OrderState::Cancelled, t0()).await.unwrap_err();
        assert_eq!(err.code(), "internal");
        assert_eq!(err.message(), "internal error");

        let unchanged = service.get_order(order_id).await.unwrap();
        assert_eq!(unchanged.order.state(), OrderState::Pending);
        assert_eq!(unchanged.panel_items().count(), 1);
        assert_eq!(dims(&store, panel_id).await, (mm(7_000), mm(5_000)));
        assert_eq!(service.movements_for_order(order_id).await.unwrap(), movements_before);

        store.fail_movements_of_kind(None);
        change(&service, order_id, OrderState::Cancelled, t0()).await.unwrap();
        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));
    }

    #[tokio::test]
    async fn transient_commit_failures_are_retried_then_surface_as_conflict() {
        let (store, service) = setup_with(RetryPolicy::fixed(2, Duration::from_millis(1)));
        let panel_id = seed(&store, panel(5_000, 5_000)).await;

        store.fail_next_commits(1);
        let view = service
            .create_order(create(vec![cut(panel_id, 1_000, 5_000, 0.5)], t0()))
            .await
            .unwrap();
        assert_eq!(dims(&store, panel_id).await, (mm(4_000), mm(5_000)));
        assert_eq!(service.movements_for_item(panel_id).await.unwrap().len(), 1);

        store.fail_next_commits(10);
        let err = change(&service, *view.order.id(), OrderState::Cancelled, t0()).await.unwrap_err();
        store.fail_next_commits(0);

        assert_eq!(err.code(), "conflict");
        assert!(matches!(err, ServiceError::RetriesExhausted { attempts: 3, .. }));
        let view = service.get_order(*view.order.id()).await.unwrap();
        assert_eq!(view.order.state(), OrderState::Pending);
        assert_eq!(dims(&store, panel_id).await, (mm(4_000), mm(5_000)));
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_no_partial_state() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;
        let floats = seed(&store, stock(StockKind::Material, 5)).await;

        let cmd = create(
            vec![
                cut(panel_id, 3_000, 2_000, 0.5),
                LineItemRequest::Material {
                    item_id: floats,
                    quantity: Quantity::new(20),
                    notes: None,
                },
            ],
            t0(),
        );
        let order_id = cmd.order_id;
        let err = service.create_order(cmd).await.unwrap_err();

        assert!(matches!(err.domain(), Some(DomainError::InsufficientStock(_))));
        assert_eq!(err.code(), "validation_error");
        assert_eq!(service.get_order(order_id).await.unwrap_err().code(), "not_found");
        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));
        assert!(service.movements_for_item(panel_id).await.unwrap().is_empty());
        assert!(service.movements_for_order(order_id).await.unwrap().is_empty());
        assert_eq!(
            item(&store, floats).await.as_stock().unwrap().available(),
            Quantity::new(5)
        );
    }

    #[tokio::test]
    async fn oversized_cut_is_insufficient_area() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(1_000, 1_000)).await;

        let err = service
            .create_order(create(vec![cut(panel_id, 2_000, 1_000, 0.0)], t0()))
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::InsufficientArea { .. })));
        assert_eq!(dims(&store, panel_id).await, (mm(1_000), mm(1_000)));
    }

    #[tokio::test]
    async fn line_items_must_match_the_catalog_type() {
        let (store, service) = setup();
        let needle = seed(&store, stock(StockKind::Tool, 3)).await;
        let panel_id = seed(&store, panel(1_000, 1_000)).await;

        let err = service
            .create_order(create(vec![cut(needle, 100, 100, 0.0)], t0()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");

        let err = service
            .create_order(create(
                vec![LineItemRequest::Material {
                    item_id: needle,
                    quantity: Quantity::new(1),
                    notes: None,
                }],
                t0(),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");

        let err = service
            .create_order(create(
                vec![LineItemRequest::Tool {
                    item_id: panel_id,
                    quantity: Quantity::new(1),
                    notes: None,
                }],
                t0(),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");

        let err = service
            .create_order(create(
                vec![LineItemRequest::Material {
                    item_id: InventoryItemId::new(),
                    quantity: Quantity::new(1),
                    notes: None,
                }],
                t0(),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn materials_and_tools_are_not_restored_on_cancel() {
        let (store, service) = setup();
        let twine = seed(&store, stock(StockKind::Material, 10)).await;
        let needle = seed(&store, stock(StockKind::Tool, 2)).await;

        let view = service
            .create_order(create(
                vec![
                    LineItemRequest::Material {
                        item_id: twine,
                        quantity: Quantity::new(3),
                        notes: None,
                    },
                    LineItemRequest::Tool {
                        item_id: needle,
                        quantity: Quantity::new(1),
                        notes: None,
                    },
                ],
                t0(),
            ))
            .await
            .unwrap();
        assert_eq!(item(&store, twine).await.as_stock().unwrap().available(), Quantity::new(7));
        assert_eq!(item(&store, needle).await.as_stock().unwrap().available(), Quantity::new(2));
        let assign = service.movements_for_item(needle).await.unwrap();
        assert_eq!(assign[0].kind, MovementKind::Assign);

        change(&service, *view.order.id(), OrderState::Cancelled, t0()).await.unwrap();
        assert_eq!(item(&store, twine).await.as_stock().unwrap().available(), Quantity::new(7));
        let after = service.get_order(*view.order.id()).await.unwrap();
        assert_eq!(after.line_items.len(), 2);
    }

    #[tokio::test]
    async fn line_items_can_be_added_only_while_open() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(8_000, 4_000)).await;
        let twine = seed(&store, stock(StockKind::Material, 10)).await;

        let view = service
            .create_order(create(vec![cut(panel_id, 2_000, 4_000, 0.5)], t0()))
            .await
            .unwrap();
        let order_id = *view.order.id();
        change(&service, order_id, OrderState::InProgress, t0()).await.unwrap();

        let added = service
            .add_line_items(AddLineItems {
                order_id,
                line_items: vec![
                    cut(panel_id, 1_000, 4_000, 0.5),
                    LineItemRequest::Material {
                        item_id: twine,
                        quantity: Quantity::new(2),
                        notes: None,
                    },
                ],
                actor: clerk(),
                occurred_at: t0(),
            })
            .await
            .unwrap();
        assert_eq!(added.line_items.len(), 3);
        assert_eq!(added.order.version(), 3);
        assert_eq!(dims(&store, panel_id).await, (mm(5_000), mm(4_000)));

        change(&service, order_id, OrderState::Completed, t0()).await.unwrap();
        let err = service
            .add_line_items(AddLineItems {
                order_id,
                line_items: vec![cut(panel_id, 1_000, 4_000, 0.5)],
                actor: clerk(),
                occurred_at: t0(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(dims(&store, panel_id).await, (mm(5_000), mm(4_000)));
    }

    #[tokio::test]
    async fn illegal_transitions_are_rejected() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(2_000, 2_000)).await;
        let view = service
            .create_order(create(vec![cut(panel_id, 1_000, 2_000, 0.0)], t0()))
            .await
            .unwrap();

        let err = change(&service, *view.order.id(), OrderState::Completed, t0()).await.unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
        let err = change(&service, OrderId::new(), OrderState::InProgress, t0()).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn computing_a_plan_reserves_nothing() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;
        let spec = CutSpecification::simple(mm(3_000), mm(2_000)).unwrap();

        let plan = service
            .compute_cut_plan(panel_id, &spec, Area::from_square_metres(0.5))
            .await
            .unwrap();
        assert_eq!(plan.utilization, 100.0);
        assert_eq!(plan.new_panel().map(|r| (r.length, r.width)), Some((mm(3_000), mm(3_000))));
        assert_eq!(dims(&store, panel_id).await, (mm(10_000), mm(5_000)));
        assert!(service.movements_for_item(panel_id).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn competing_cuts_on_one_panel_never_both_succeed() {
        let (store, service) = setup();
        let panel_id = seed(&store, panel(10_000, 5_000)).await;

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create_order(create(vec![cut(panel_id, 6_000, 5_000, 0.5)], t0()))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert!(matches!(e.code(), "validation_error" | "conflict"), "{e}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(dims(&store, panel_id).await, (mm(4_000), mm(5_000)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consumption_never_drives_stock_negative() {
        let (store, service) = setup_with(RetryPolicy::default());
        let rope = seed(&store, stock(StockKind::Material, 10)).await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create_order(create(
                            vec![LineItemRequest::Material {
                                item_id: rope,
                                quantity: Quantity::new(2),
                                notes: None,
                            }],
                            t0(),
                        ))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 5);
        assert_eq!(item(&store, rope).await.as_stock().unwrap().available(), Quantity::ZERO);
        assert_eq!(service.movements_for_item(rope).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn spawned_scheduler_runs_and_shuts_down() {
        let (_store, service) = setup();
        let handle = housekeeping(&service).spawn();

        for _ in 0..200 {
            if handle.stats().ticks > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(handle.stats().ticks >= 1);
        handle.shutdown().await;
    }
}
