//! Query representation and planning.

pub mod planner;
#[allow(clippy::module_inception)]
pub mod query;

pub use planner::{PlannedQuery, QueryPlanner};
pub use query::{Op, Query, QueryNode};
