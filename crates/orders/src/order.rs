use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use panelstock_core::{Actor, AggregateRoot, Area, DomainError, DomainResult, InventoryItemId, OrderId, Quantity};
use panelstock_cutting::CutSpecification;

use crate::line_item::{LineItem, LineItemKind};
use crate::state::{transition_effect, OrderState, Priority, TransitionEffect};

/// Persisted form of an order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub client_ref: String,
    pub state: OrderState,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: u64,
}

/// Aggregate root: a production order header.
///
/// Line items are stored separately and loaded alongside (see [`OrderView`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    client_ref: String,
    state: OrderState,
    priority: Priority,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Order {
    /// A freshly created order, ready for production (`Pending`).
    pub fn create(cmd: &CreateOrder) -> DomainResult<Self> {
        if cmd.line_items.is_empty() {
            return Err(DomainError::validation("an order needs at least one line item"));
        }
        Self::new_header(cmd.order_id, &cmd.client_ref, cmd.priority, OrderState::Pending, cmd.occurred_at)
    }

    /// A header-only order in `Draft`. It holds no allocations until it is submitted.
    pub fn draft(cmd: &CreateDraft) -> DomainResult<Self> {
        Self::new_header(cmd.order_id, &cmd.client_ref, cmd.priority, OrderState::Draft, cmd.occurred_at)
    }

    fn new_header(
        id: OrderId,
        client_ref: &str,
        priority: Priority,
        state: OrderState,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if client_ref.trim().is_empty() {
            return Err(DomainError::validation("client_ref cannot be empty"));
        }
        Ok(Self {
            id,
            client_ref: client_ref.to_string(),
            state,
            priority,
            created_at: at,
            updated_at: at,
            completed_at: None,
            version: 1,
        })
    }

    pub fn from_snapshot(s: OrderSnapshot) -> Self {
        Self {
            id: s.id,
            client_ref: s.client_ref,
            state: s.state,
            priority: s.priority,
            created_at: s.created_at,
            updated_at: s.updated_at,
            completed_at: s.completed_at,
            version: s.version,
        }
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            id: self.id,
            client_ref: self.client_ref.clone(),
            state: self.state,
            priority: self.priority,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
            version: self.version,
        }
    }

    pub fn client_ref(&self) -> &str {
        &self.client_ref
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Move to `target`, returning the side effect the caller must run in the same
    /// transaction. Illegal moves leave the order untouched.
    pub fn transition(&mut self, target: OrderState, at: DateTime<Utc>) -> DomainResult<TransitionEffect> {
        let effect = transition_effect(self.state, target)
            .ok_or_else(|| DomainError::invalid_transition(self.state, target))?;

        self.state = target;
        if effect == TransitionEffect::StampCompletion {
            self.completed_at = Some(at);
        }
        self.touch(at);
        Ok(effect)
    }

    /// Guard for adding line items after creation.
    pub fn ensure_accepts_line_items(&self) -> DomainResult<()> {
        if self.state.accepts_line_items() {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "cannot add line items to a {} order",
                self.state
            )))
        }
    }

    /// Record a change that does not alter the state (e.g. new line items).
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// An order header together with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub order: Order,
    pub line_items: Vec<LineItem>,
}

impl OrderView {
    pub fn panel_items(&self) -> impl Iterator<Item = &LineItem> {
        self.line_items.iter().filter(|li| li.kind == LineItemKind::Panel)
    }
}

/// One requested allocation, before it has been validated against inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineItemRequest {
    Panel {
        panel_id: InventoryItemId,
        specification: CutSpecification,
        /// Strips smaller than this are scrapped instead of re-inserted.
        remnant_threshold: Area,
        notes: Option<String>,
    },
    Material {
        item_id: InventoryItemId,
        quantity: Quantity,
        notes: Option<String>,
    },
    Tool {
        item_id: InventoryItemId,
        quantity: Quantity,
        notes: Option<String>,
    },
}

impl LineItemRequest {
    pub fn kind(&self) -> LineItemKind {
        match self {
            LineItemRequest::Panel { .. } => LineItemKind::Panel,
            LineItemRequest::Material { .. } => LineItemKind::Material,
            LineItemRequest::Tool { .. } => LineItemKind::Tool,
        }
    }

    pub fn item_id(&self) -> InventoryItemId {
        match self {
            LineItemRequest::Panel { panel_id, .. } => *panel_id,
            LineItemRequest::Material { item_id, .. } | LineItemRequest::Tool { item_id, .. } => *item_id,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        match self {
            LineItemRequest::Panel { notes, .. }
            | LineItemRequest::Material { notes, .. }
            | LineItemRequest::Tool { notes, .. } => notes.as_deref(),
        }
    }
}

/// Command: CreateOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub order_id: OrderId,
    pub client_ref: String,
    pub priority: Priority,
    pub line_items: Vec<LineItemRequest>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CreateDraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDraft {
    pub order_id: OrderId,
    pub client_ref: String,
    pub priority: Priority,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeOrderState.
///
/// Used both by request handlers and by the housekeeping scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOrderState {
    pub order_id: OrderId,
    pub target: OrderState,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLineItems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLineItems {
    pub order_id: OrderId,
    pub line_items: Vec<LineItemRequest>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}
