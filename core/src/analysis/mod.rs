//! Reachability and planning analyses

pub mod planner;
pub mod reachability;

pub use planner::{plans, Plans};
pub use reachability::reachable;
