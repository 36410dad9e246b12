//! Constraint audit of plans.
//!
//! The [`GiantTour`](crate::plan::GiantTour) keeps incremental schedules;
//! the [`ScenarioEvaluator`] recomputes them from scratch and lists every
//! violated constraint.

mod evaluator;

pub use evaluator::{ScenarioEvaluator, Violation, ViolationType};
