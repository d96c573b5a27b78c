//! Inventory domain module: panels, stock items and the movement ledger rules.
//!
//! This crate contains business rules for inventory balances, implemented purely as
//! deterministic domain logic (no IO, no storage). Persisting movements and locking
//! rows is the job of `panelstock-infra`.

pub mod item;
pub mod movement;
pub mod panel;
pub mod stock;

pub use item::InventoryItem;
pub use movement::{replay, Axis, Balance, BalanceEffect, InventoryMovement, MovementDelta, MovementKind};
pub use panel::{NewPanel, Panel, QualityState};
pub use stock::{NewStockItem, StockItem, StockKind};
