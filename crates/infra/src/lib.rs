//! Infrastructure layer: stores, ledger writes, order orchestration, housekeeping,
//! config and retry.

pub mod compensation;
pub mod config;
pub mod error;
pub mod housekeeping;
pub mod ledger;
pub mod orders;
pub mod retry;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use config::{ConfigError, HousekeepingConfig, PanelstockConfig, StoreConfig};
pub use error::{ErrorKind, ServiceError};
pub use housekeeping::{HousekeepingHandle, HousekeepingScheduler, JobReport};
pub use orders::OrderService;
pub use retry::{BackoffStrategy, RetryPolicy};
pub use store::{InMemoryStore, InventoryStore, PgInventoryStore, StoreError, StoreTx};
