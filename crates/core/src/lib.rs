//! `panelstock-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod actor;
pub mod aggregate;
pub mod error;
pub mod id;
pub mod measure;

pub use actor::Actor;
pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{InventoryItemId, LineItemId, MovementId, OrderId, UserId};
pub use measure::{Area, Length, Quantity};
