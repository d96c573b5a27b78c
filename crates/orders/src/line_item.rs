use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use panelstock_core::{Area, DomainError, DomainResult, InventoryItemId, LineItemId, OrderId, Quantity};
use panelstock_cutting::{AxisCut, CutPlan, CutSpecification};
use panelstock_inventory::StockKind;

/// Catalog type a line item draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    Panel,
    Material,
    Tool,
}

impl LineItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LineItemKind::Panel => "panel",
            LineItemKind::Material => "material",
            LineItemKind::Tool => "tool",
        }
    }

    /// Stock kind a non-panel line item must reference.
    pub fn stock_kind(self) -> Option<StockKind> {
        match self {
            LineItemKind::Panel => None,
            LineItemKind::Material => Some(StockKind::Material),
            LineItemKind::Tool => Some(StockKind::Tool),
        }
    }
}

impl core::fmt::Display for LineItemKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for LineItemKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "panel" => Ok(LineItemKind::Panel),
            "material" => Ok(LineItemKind::Material),
            "tool" => Ok(LineItemKind::Tool),
            other => Err(DomainError::validation(format!("unknown line item kind: {other}"))),
        }
    }
}

/// Kind-specific payload, persisted as JSON next to the line item row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineItemDetail {
    Panel {
        specification: CutSpecification,
        plan: CutPlan,
        /// Exactly what was taken off the source panel; compensation adds it back.
        consumed: AxisCut,
        /// Remnant panels this cut inserted into inventory.
        remnant_panels: Vec<InventoryItemId>,
    },
    Stock {
        quantity: Quantity,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub kind: LineItemKind,
    pub item_id: InventoryItemId,
    pub notes: Option<String>,
    pub detail: LineItemDetail,
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    pub fn panel(
        order_id: OrderId,
        panel_id: InventoryItemId,
        specification: CutSpecification,
        plan: CutPlan,
        remnant_panels: Vec<InventoryItemId>,
        notes: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let consumed = plan.axis_cut;
        Self {
            id: LineItemId::new(),
            order_id,
            kind: LineItemKind::Panel,
            item_id: panel_id,
            notes,
            detail: LineItemDetail::Panel {
                specification,
                plan,
                consumed,
                remnant_panels,
            },
            created_at,
        }
    }

    pub fn stock(
        order_id: OrderId,
        kind: LineItemKind,
        item_id: InventoryItemId,
        quantity: Quantity,
        notes: Option<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if kind == LineItemKind::Panel {
            return Err(DomainError::validation("panel line items need a cut specification"));
        }
        if !quantity.is_positive() {
            return Err(DomainError::validation(format!(
                "{kind} line item quantity must be positive"
            )));
        }
        Ok(Self {
            id: LineItemId::new(),
            order_id,
            kind,
            item_id,
            notes,
            detail: LineItemDetail::Stock { quantity },
            created_at,
        })
    }

    /// Pieces cut for panels, units for materials and tools.
    pub fn quantity(&self) -> Quantity {
        match &self.detail {
            LineItemDetail::Panel { specification, .. } => {
                Quantity::new(specification.piece_count() as i64)
            }
            LineItemDetail::Stock { quantity } => *quantity,
        }
    }

    pub fn consumed(&self) -> Option<AxisCut> {
        match &self.detail {
            LineItemDetail::Panel { consumed, .. } => Some(*consumed),
            LineItemDetail::Stock { .. } => None,
        }
    }

    pub fn remnant_panels(&self) -> &[InventoryItemId] {
        match &self.detail {
            LineItemDetail::Panel { remnant_panels, .. } => remnant_panels,
            LineItemDetail::Stock { .. } => &[],
        }
    }

    pub fn waste_area(&self) -> Area {
        match &self.detail {
            LineItemDetail::Panel { plan, .. } => plan.waste_area(),
            LineItemDetail::Stock { .. } => Area::ZERO,
        }
    }
}
