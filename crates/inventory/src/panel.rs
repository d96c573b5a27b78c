use serde::{Deserialize, Serialize};

use panelstock_core::{AggregateRoot, Area, DomainError, DomainResult, InventoryItemId, Length, OrderId};

use crate::movement::{Axis, Balance, BalanceEffect, MovementDelta, MovementKind};

/// Physical condition of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityState {
    Good,
    /// Offcut re-inserted after a cut.
    Remnant,
    Damaged,
    /// Taken out of circulation (e.g. remnant reclaimed on cancellation).
    Retired,
}

impl QualityState {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityState::Good => "good",
            QualityState::Remnant => "remnant",
            QualityState::Damaged => "damaged",
            QualityState::Retired => "retired",
        }
    }
}

impl core::str::FromStr for QualityState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(QualityState::Good),
            "remnant" => Ok(QualityState::Remnant),
            "damaged" => Ok(QualityState::Damaged),
            "retired" => Ok(QualityState::Retired),
            other => Err(DomainError::validation(format!("unknown quality state: {other}"))),
        }
    }
}

/// Input for creating a panel record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPanel {
    pub id: InventoryItemId,
    pub material_type: String,
    pub length: Length,
    pub width: Length,
    pub quality: QualityState,
    pub location: String,
    /// Price in minor currency units per square metre.
    pub unit_price: i64,
    pub source_panel: Option<InventoryItemId>,
    pub origin_order: Option<OrderId>,
}

/// A rectangular piece of netting tracked by length and width.
///
/// Area is always derived from the two dimensions and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    id: InventoryItemId,
    material_type: String,
    length: Length,
    width: Length,
    quality: QualityState,
    location: String,
    unit_price: i64,
    source_panel: Option<InventoryItemId>,
    origin_order: Option<OrderId>,
    version: u64,
}

impl Panel {
    pub fn new(spec: NewPanel) -> DomainResult<Self> {
        if spec.length.is_negative() || spec.width.is_negative() {
            return Err(DomainError::validation("panel dimensions cannot be negative"));
        }
        if spec.material_type.trim().is_empty() {
            return Err(DomainError::validation("material_type cannot be empty"));
        }
        if spec.unit_price < 0 {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }
        Ok(Self {
            id: spec.id,
            material_type: spec.material_type,
            length: spec.length,
            width: spec.width,
            quality: spec.quality,
            location: spec.location,
            unit_price: spec.unit_price,
            source_panel: spec.source_panel,
            origin_order: spec.origin_order,
            version: 0,
        })
    }

    /// Offcut of `source` produced by `order`, inheriting material, location and price.
    pub fn remnant_of(source: &Panel, order: OrderId, length: Length, width: Length) -> DomainResult<Self> {
        Self::new(NewPanel {
            id: InventoryItemId::new(),
            material_type: source.material_type.clone(),
            length,
            width,
            quality: QualityState::Remnant,
            location: source.location.clone(),
            unit_price: source.unit_price,
            source_panel: Some(source.id),
            origin_order: Some(order),
        })
    }

    /// Restore the persisted version when loading from a store.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn material_type(&self) -> &str {
        &self.material_type
    }

    pub fn length(&self) -> Length {
        self.length
    }

    pub fn width(&self) -> Length {
        self.width
    }

    pub fn dimension(&self, axis: Axis) -> Length {
        match axis {
            Axis::Length => self.length,
            Axis::Width => self.width,
        }
    }

    pub fn area(&self) -> Area {
        self.length * self.width
    }

    pub fn quality(&self) -> QualityState {
        self.quality
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn unit_price(&self) -> i64 {
        self.unit_price
    }

    pub fn source_panel(&self) -> Option<InventoryItemId> {
        self.source_panel
    }

    pub fn origin_order(&self) -> Option<OrderId> {
        self.origin_order
    }

    pub fn is_retired(&self) -> bool {
        self.quality == QualityState::Retired
    }

    /// Take the panel out of circulation; dimensions are left to the ledger.
    pub fn retire(&mut self) {
        self.quality = QualityState::Retired;
    }

    fn dimension_mut(&mut self, axis: Axis) -> &mut Length {
        match axis {
            Axis::Length => &mut self.length,
            Axis::Width => &mut self.width,
        }
    }
}

impl AggregateRoot for Panel {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Balance for Panel {
    fn item_id(&self) -> InventoryItemId {
        self.id
    }

    fn apply_movement(&mut self, kind: MovementKind, delta: &MovementDelta) -> DomainResult<()> {
        let MovementDelta::Dimension { axis, amount } = *delta else {
            return Err(DomainError::validation(format!(
                "panel {} only accepts dimension movements",
                self.id
            )));
        };
        if !amount.is_positive() {
            return Err(DomainError::validation("movement amount must be positive"));
        }

        let current = self.dimension(axis);
        let next = match kind.effect() {
            BalanceEffect::Decrease => current
                .checked_sub(amount)
                .filter(|v| !v.is_negative())
                .ok_or_else(|| {
                    DomainError::negative_balance(format!(
                        "panel {} {axis} is {current}, cannot {kind} {amount}",
                        self.id
                    ))
                })?,
            BalanceEffect::Increase => current
                .checked_add(amount)
                .ok_or_else(|| DomainError::invariant(format!("panel {} {axis} overflow", self.id)))?,
            BalanceEffect::Unchanged => current,
        };

        *self.dimension_mut(axis) = next;
        self.version += 1;
        Ok(())
    }
}
