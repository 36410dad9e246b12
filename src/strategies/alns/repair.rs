//! Repair operators for ALNS over scenarios.
//!
//! # Operators
//!
//! - [`Insertion::Greedy`] — Repeatedly inserts the request with the cheapest
//!   feasible insertion
//! - [`Insertion::Regret`] — Regret-2: inserts first the request that loses
//!   the most if its best tour becomes unavailable
//!
//! Requests without a feasible position stay unassigned and keep costing
//! the scenario's unserved penalty.
//!
//! # Reference
//!
//! Ropke, S. & Pisinger, D. (2006). "An Adaptive Large Neighborhood Search
//! Heuristic for the Pickup and Delivery Problem with Time Windows",
//! *Transportation Science* 40(4), 455-472.

use rand::Rng;
use u_metaheur::alns::RepairOperator;

use crate::manager::BudgetClock;
use crate::models::NodeId;
use crate::plan::Scenario;
use crate::strategies::insertion::{cheapest_insertion, insertion_candidates};

/// Insertion heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Greedy,
    Regret,
}

impl Insertion {
    pub const ALL: [Insertion; 2] = [Insertion::Greedy, Insertion::Regret];

    /// Inserts unassigned requests in place until none fits.
    pub fn apply(&self, scenario: &mut Scenario) {
        while let Some((pred, node)) = self.select(scenario) {
            if scenario.insert_after(pred, node).is_err() {
                break;
            }
        }
    }

    /// Like [`apply`](Self::apply), one insertion per budget iteration.
    ///
    /// Returns `false` if the budget ran out while a request could still be
    /// inserted.
    pub fn apply_within(&self, scenario: &mut Scenario, clock: &mut BudgetClock) -> bool {
        while let Some((pred, node)) = self.select(scenario) {
            if clock.is_exhausted() {
                return false;
            }
            if scenario.insert_after(pred, node).is_err() {
                break;
            }
            clock.tick();
        }
        true
    }

    /// Next `(predecessor, request)` pair to insert.
    fn select(&self, scenario: &Scenario) -> Option<(NodeId, NodeId)> {
        let plan = scenario.plan();
        match self {
            Insertion::Greedy => scenario
                .unassigned()
                .filter_map(|n| cheapest_insertion(plan, n).map(|(p, c)| (p, n, c)))
                .min_by(|a, b| a.2.total_cmp(&b.2))
                .map(|(p, n, _)| (p, n)),
            Insertion::Regret => scenario
                .unassigned()
                .filter_map(|n| {
                    let candidates = insertion_candidates(plan, n);
                    let (pred, best) = *candidates.first()?;
                    let regret = candidates.get(1).map_or(f64::INFINITY, |c| c.1 - best);
                    Some((pred, n, regret, best))
                })
                .max_by(|a, b| a.2.total_cmp(&b.2).then(b.3.total_cmp(&a.3)))
                .map(|(p, n, _, _)| (p, n)),
        }
    }
}

impl RepairOperator<Scenario> for Insertion {
    fn name(&self) -> &str {
        match self {
            Insertion::Greedy => "greedy_insertion",
            Insertion::Regret => "regret_insertion",
        }
    }

    fn repair<R: Rng>(&self, solution: &Scenario, _rng: &mut R) -> Scenario {
        let mut scenario = solution.clone();
        self.apply(&mut scenario);
        scenario
    }
}
