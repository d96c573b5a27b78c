use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use panelstock_core::{Actor, DomainError, DomainResult, InventoryItemId, Length, MovementId, OrderId, Quantity};

/// Kind of ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Stock used up by an order.
    Consume,
    /// Tool handed to an order; balance unchanged.
    Assign,
    /// Positive correction (compensation, remnant creation, receipts).
    AdjustIn,
    /// Negative correction (write-offs, remnant retirement).
    AdjustOut,
    /// Unused stock handed back.
    Return,
}

/// How a movement kind changes a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEffect {
    Increase,
    Decrease,
    Unchanged,
}

impl MovementKind {
    pub const ALL: [MovementKind; 5] = [
        MovementKind::Consume,
        MovementKind::Assign,
        MovementKind::AdjustIn,
        MovementKind::AdjustOut,
        MovementKind::Return,
    ];

    pub fn effect(self) -> BalanceEffect {
        match self {
            MovementKind::Consume | MovementKind::AdjustOut => BalanceEffect::Decrease,
            MovementKind::AdjustIn | MovementKind::Return => BalanceEffect::Increase,
            MovementKind::Assign => BalanceEffect::Unchanged,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Consume => "consume",
            MovementKind::Assign => "assign",
            MovementKind::AdjustIn => "adjust_in",
            MovementKind::AdjustOut => "adjust_out",
            MovementKind::Return => "return",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown movement kind: {s}")))
    }
}

/// Panel dimension a movement applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Length,
    Width,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Length => "length",
            Axis::Width => "width",
        }
    }
}

impl core::fmt::Display for Axis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Axis {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "length" => Ok(Axis::Length),
            "width" => Ok(Axis::Width),
            other => Err(DomainError::validation(format!("unknown axis: {other}"))),
        }
    }
}

/// What a movement changes: one panel dimension, or a unit count.
///
/// The axis is always carried explicitly so compensation never has to guess which
/// dimension was cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MovementDelta {
    Dimension { axis: Axis, amount: Length },
    Quantity { amount: Quantity },
}

impl MovementDelta {
    pub fn dimension(axis: Axis, amount: Length) -> Self {
        Self::Dimension { axis, amount }
    }

    pub fn quantity(amount: Quantity) -> Self {
        Self::Quantity { amount }
    }

    pub fn axis(&self) -> Option<Axis> {
        match self {
            MovementDelta::Dimension { axis, .. } => Some(*axis),
            MovementDelta::Quantity { .. } => None,
        }
    }

    fn ensure_positive(&self) -> DomainResult<()> {
        let positive = match self {
            MovementDelta::Dimension { amount, .. } => amount.is_positive(),
            MovementDelta::Quantity { amount } => amount.is_positive(),
        };
        if positive {
            Ok(())
        } else {
            Err(DomainError::validation("movement amount must be positive"))
        }
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    pub item_id: InventoryItemId,
    pub kind: MovementKind,
    pub delta: MovementDelta,
    pub order_id: Option<OrderId>,
    pub occurred_at: DateTime<Utc>,
    pub actor: Actor,
    pub notes: Option<String>,
}

impl InventoryMovement {
    pub fn new(
        item_id: InventoryItemId,
        kind: MovementKind,
        delta: MovementDelta,
        order_id: Option<OrderId>,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        delta.ensure_positive()?;
        Ok(Self {
            id: MovementId::new(),
            item_id,
            kind,
            delta,
            order_id,
            occurred_at,
            actor,
            notes: None,
        })
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A live balance that ledger movements are applied to.
pub trait Balance {
    fn item_id(&self) -> InventoryItemId;

    /// Apply one movement, failing with `NegativeBalance` rather than going below zero.
    fn apply_movement(&mut self, kind: MovementKind, delta: &MovementDelta) -> DomainResult<()>;
}

/// Re-derive a balance by applying `movements` (in order) to `start`.
///
/// Movements for other items are rejected, so a replay cannot silently mix ledgers.
pub fn replay<B: Balance + Clone>(start: &B, movements: &[InventoryMovement]) -> DomainResult<B> {
    let mut balance = start.clone();
    for m in movements {
        if m.item_id != balance.item_id() {
            return Err(DomainError::invariant(format!(
                "movement {} belongs to item {}, not {}",
                m.id,
                m.item_id,
                balance.item_id()
            )));
        }
        balance.apply_movement(m.kind, &m.delta)?;
    }
    Ok(balance)
}
