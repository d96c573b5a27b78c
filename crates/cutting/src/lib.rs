//! Cut planning for rectangular netting panels.
//!
//! Pure computation: no I/O, no clocks. The order service persists the resulting
//! [`CutPlan`] on the panel line item and drives the ledger from its [`AxisCut`].

pub mod plan;
pub mod specification;

pub use plan::{compute_cut_plan, AxisCut, CutPlan, Rect, Remnant, RemnantDisposition, StripRole};
pub use specification::{CutRequest, CutSpecification};
