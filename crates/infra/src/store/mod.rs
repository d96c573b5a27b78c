//! Transactional storage boundary.
//!
//! [`InventoryStore`] abstracts a relational store with row-level locking. Two
//! implementations ship: [`InMemoryStore`] for tests and development, and
//! [`PgInventoryStore`] for Postgres.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PgInventoryStore;
pub use r#trait::{InventoryStore, StoreError, StoreTx};
