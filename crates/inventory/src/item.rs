use serde::{Deserialize, Serialize};

use panelstock_core::{AggregateRoot, DomainError, DomainResult, InventoryItemId};

use crate::movement::{Balance, MovementDelta, MovementKind};
use crate::panel::Panel;
use crate::stock::StockItem;

/// Any row of the inventory table; the unit the store locks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryItem {
    Panel(Panel),
    Stock(StockItem),
}

impl InventoryItem {
    pub fn as_panel(&self) -> Option<&Panel> {
        match self {
            InventoryItem::Panel(p) => Some(p),
            InventoryItem::Stock(_) => None,
        }
    }

    pub fn as_stock(&self) -> Option<&StockItem> {
        match self {
            InventoryItem::Panel(_) => None,
            InventoryItem::Stock(s) => Some(s),
        }
    }

    pub fn panel_mut(&mut self) -> DomainResult<&mut Panel> {
        match self {
            InventoryItem::Panel(p) => Ok(p),
            InventoryItem::Stock(s) => Err(DomainError::validation(format!(
                "item {} is a {}, not a panel",
                s.item_id(),
                s.kind().as_str()
            ))),
        }
    }

    /// Catalog name used in messages and the `kind` column: `panel`, `material` or `tool`.
    pub fn catalog_type(&self) -> &'static str {
        match self {
            InventoryItem::Panel(_) => "panel",
            InventoryItem::Stock(s) => s.kind().as_str(),
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            InventoryItem::Panel(p) => p.version(),
            InventoryItem::Stock(s) => s.version(),
        }
    }
}

impl From<Panel> for InventoryItem {
    fn from(p: Panel) -> Self {
        InventoryItem::Panel(p)
    }
}

impl From<StockItem> for InventoryItem {
    fn from(s: StockItem) -> Self {
        InventoryItem::Stock(s)
    }
}

impl Balance for InventoryItem {
    fn item_id(&self) -> InventoryItemId {
        match self {
            InventoryItem::Panel(p) => p.item_id(),
            InventoryItem::Stock(s) => s.item_id(),
        }
    }

    fn apply_movement(&mut self, kind: MovementKind, delta: &MovementDelta) -> DomainResult<()> {
        match self {
            InventoryItem::Panel(p) => p.apply_movement(kind, delta),
            InventoryItem::Stock(s) => s.apply_movement(kind, delta),
        }
    }
}
