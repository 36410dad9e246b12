//! Destroy operators for ALNS over scenarios.
//!
//! Only unfrozen requests are ever removed; removed requests become
//! unassigned.
//!
//! # Operators
//!
//! - [`Removal::Random`] — Removes random requests
//! - [`Removal::Worst`] — Removes requests with the highest removal savings
//! - [`Removal::Related`] — Removes a random request and its nearest neighbours
//!
//! # Reference
//!
//! Ropke, S. & Pisinger, D. (2006). "An Adaptive Large Neighborhood Search
//! Heuristic for the Pickup and Delivery Problem with Time Windows",
//! *Transportation Science* 40(4), 455-472.

use rand::seq::SliceRandom;
use rand::Rng;
use u_metaheur::alns::DestroyOperator;

use crate::models::NodeId;
use crate::plan::Scenario;

/// Removal heuristics. The runner takes one operator type, hence the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Random,
    Worst,
    /// Shaw-style relatedness by travel distance.
    Related,
}

impl Removal {
    pub const ALL: [Removal; 3] = [Removal::Random, Removal::Worst, Removal::Related];

    fn targets<R: Rng>(&self, scenario: &Scenario, mut movable: Vec<NodeId>, k: usize, rng: &mut R) -> Vec<NodeId> {
        match self {
            Removal::Random => {
                movable.shuffle(rng);
            }
            Removal::Worst => {
                let plan = scenario.plan();
                movable.sort_by(|&a, &b| plan.removal_saving(b).total_cmp(&plan.removal_saving(a)));
            }
            Removal::Related => {
                let seed = movable[rng.random_range(0..movable.len())];
                let instance = scenario.instance();
                movable.sort_by(|&a, &b| {
                    instance
                        .distance(seed, a)
                        .total_cmp(&instance.distance(seed, b))
                });
            }
        }
        movable.truncate(k);
        movable
    }
}

impl DestroyOperator<Scenario> for Removal {
    fn name(&self) -> &str {
        match self {
            Removal::Random => "random_removal",
            Removal::Worst => "worst_removal",
            Removal::Related => "related_removal",
        }
    }

    fn destroy<R: Rng>(&self, solution: &Scenario, degree: f64, rng: &mut R) -> Scenario {
        let mut scenario = solution.clone();
        let movable: Vec<NodeId> = scenario.plan().movable_requests().collect();
        if movable.is_empty() {
            return scenario;
        }
        let k = ((movable.len() as f64 * degree).round() as usize).clamp(1, movable.len());
        for n in self.targets(&scenario, movable, k, rng) {
            // movable by construction
            let _ = scenario.remove_node(n);
        }
        scenario
    }
}
