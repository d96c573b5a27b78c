//! Production orders: headers, line items and the lifecycle state machine.

pub mod line_item;
pub mod order;
pub mod state;

pub use line_item::{LineItem, LineItemDetail, LineItemKind};
pub use order::{AddLineItems, ChangeOrderState, CreateDraft, CreateOrder, LineItemRequest, Order, OrderSnapshot, OrderView};
pub use state::{transition_effect, OrderState, Priority, TransitionEffect, TRANSITIONS};
