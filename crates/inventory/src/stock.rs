use serde::{Deserialize, Serialize};

use panelstock_core::{AggregateRoot, DomainError, DomainResult, InventoryItemId, Quantity};

use crate::movement::{Balance, BalanceEffect, MovementDelta, MovementKind};

/// Catalog type of a counted stock item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockKind {
    /// Consumable (thread, rope, floats); decremented when used.
    Material,
    /// Reusable equipment; assigned to orders, never decremented.
    Tool,
}

impl StockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StockKind::Material => "material",
            StockKind::Tool => "tool",
        }
    }
}

impl core::str::FromStr for StockKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "material" => Ok(StockKind::Material),
            "tool" => Ok(StockKind::Tool),
            other => Err(DomainError::validation(format!("unknown stock kind: {other}"))),
        }
    }
}

/// Input for creating a stock item record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockItem {
    pub id: InventoryItemId,
    pub kind: StockKind,
    pub name: String,
    pub available: Quantity,
    pub unit: String,
    pub category: String,
}

/// A counted material or tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    id: InventoryItemId,
    kind: StockKind,
    name: String,
    available: Quantity,
    unit: String,
    category: String,
    version: u64,
}

impl StockItem {
    pub fn new(spec: NewStockItem) -> DomainResult<Self> {
        if spec.available.is_negative() {
            return Err(DomainError::validation("available quantity cannot be negative"));
        }
        if spec.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(Self {
            id: spec.id,
            kind: spec.kind,
            name: spec.name,
            available: spec.available,
            unit: spec.unit,
            category: spec.category,
            version: 0,
        })
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn kind(&self) -> StockKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn available(&self) -> Quantity {
        self.available
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

impl AggregateRoot for StockItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Balance for StockItem {
    fn item_id(&self) -> InventoryItemId {
        self.id
    }

    fn apply_movement(&mut self, kind: MovementKind, delta: &MovementDelta) -> DomainResult<()> {
        let MovementDelta::Quantity { amount } = *delta else {
            return Err(DomainError::validation(format!(
                "stock item {} only accepts quantity movements",
                self.id
            )));
        };
        if !amount.is_positive() {
            return Err(DomainError::validation("movement amount must be positive"));
        }

        let next = match kind.effect() {
            BalanceEffect::Decrease => self
                .available
                .checked_sub(amount)
                .filter(|v| !v.is_negative())
                .ok_or_else(|| {
                    DomainError::negative_balance(format!(
                        "{} {} has {} {}, cannot {kind} {amount}",
                        self.kind.as_str(),
                        self.id,
                        self.available,
                        self.unit
                    ))
                })?,
            BalanceEffect::Increase => self
                .available
                .checked_add(amount)
                .ok_or_else(|| DomainError::invariant(format!("stock item {} overflow", self.id)))?,
            BalanceEffect::Unchanged => self.available,
        };

        self.available = next;
        self.version += 1;
        Ok(())
    }
}
