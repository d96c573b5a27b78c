//! Periodic housekeeping: auto-cancelling stale orders and purging panel line items of
//! long-completed orders.
//!
//! Both jobs go through the same transactional code paths (and lock ordering) as
//! request-driven calls, so they are safe to run alongside live traffic and to repeat.

pub mod jobs;
pub mod scheduler;

pub use jobs::{auto_cancel_stale_orders, purge_completed_panel_items, HousekeepingJob, JobReport, HOUSEKEEPING_ACTOR};
pub use scheduler::{HousekeepingHandle, HousekeepingScheduler, SchedulerStats};
