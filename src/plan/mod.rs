//! Plan representation.
//!
//! - [`GiantTour`] — all tours of a plan as one predecessor/successor
//!   permutation with incremental time propagation and frozen nodes
//! - [`Tour`] — per-resource header (endpoints, frontier, totals)
//! - [`Scenario`] — a complete candidate plan with identity, cost and age
//! - [`PlanError`] — failures of plan mutations

mod error;
mod giant;
mod scenario;
mod tour;

pub use error::PlanError;
pub use giant::{GiantTour, EPS};
pub use scenario::{Scenario, ScenarioId};
pub use tour::{Tour, TourIter};
