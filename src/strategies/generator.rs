//! Randomized time-window-aware nearest-neighbour scenario generation.
//!
//! # Algorithm
//!
//! 1. Replay the committed visits of every resource as the frozen prefix of
//!    its tour.
//! 2. Register every pending actual request and the sampled requests.
//! 3. Extend each tour from its last node with a nearby request that can
//!    still be inserted feasibly (time window, capacity, capability), picked
//!    uniformly among the `breadth` nearest candidates. Move on to the next
//!    resource when no candidate fits.
//!
//! Requests left over stay unassigned for the optimizer.
//!
//! # Reference
//!
//! Solomon, M.M. (1987). "Algorithms for the Vehicle Routing and Scheduling
//! Problems with Time Window Constraints", *Operations Research* 35(2), 254-265.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::{ScenarioGenerator, StrategyContext, StrategyError};
use crate::models::NodeId;
use crate::plan::{PlanError, Scenario};
use crate::world::World;

/// Builds scenarios with a randomized nearest-neighbour heuristic.
#[derive(Debug, Clone, Copy)]
pub struct NearestNeighborGenerator {
    breadth: usize,
}

impl NearestNeighborGenerator {
    pub fn new() -> Self {
        Self { breadth: 2 }
    }

    /// Number of nearest candidates the next visit is drawn from; 1 gives
    /// the plain nearest-neighbour rule.
    pub fn with_breadth(mut self, breadth: usize) -> Self {
        self.breadth = breadth.max(1);
        self
    }

    /// Replays the committed visits of `world` as frozen tour prefixes.
    pub fn replay_commitments(scenario: &mut Scenario, world: &World) -> Result<(), PlanError> {
        for (r, state) in world.resources().iter().enumerate() {
            for visit in state.visits().iter().skip(1) {
                if scenario.instance().is_request(visit.node) {
                    let frontier = scenario
                        .plan()
                        .tour(r)
                        .ok_or(PlanError::NotInTour(visit.node))?
                        .frontier();
                    scenario.add_request(visit.node)?;
                    scenario.insert_after(frontier, visit.node)?;
                }
                scenario.freeze(visit.node, visit.arrival, visit.departure)?;
            }
        }
        Ok(())
    }

    fn construct(&self, scenario: &mut Scenario, rng: &mut StdRng) -> Result<(), PlanError> {
        let mut order: Vec<usize> = (0..scenario.plan().tours().len()).collect();
        order.shuffle(rng);
        for r in order {
            while let Some(next) = self.pick_next(scenario, r, rng) {
                let last = last_node(scenario, r).ok_or(PlanError::NotInTour(next))?;
                scenario.insert_after(last, next)?;
            }
        }
        Ok(())
    }

    fn pick_next(&self, scenario: &Scenario, resource: usize, rng: &mut StdRng) -> Option<NodeId> {
        let plan = scenario.plan();
        let last = last_node(scenario, resource)?;
        let instance = scenario.instance();
        let mut candidates: Vec<(NodeId, f64)> = scenario
            .unassigned()
            .filter(|&n| plan.can_insert(last, n))
            .map(|n| (n, instance.distance(last, n)))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        let k = self.breadth.min(candidates.len());
        Some(candidates[rng.random_range(0..k)].0)
    }
}

impl Default for NearestNeighborGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Node right before the end of a tour.
fn last_node(scenario: &Scenario, resource: usize) -> Option<NodeId> {
    let plan = scenario.plan();
    plan.pred(plan.tour(resource)?.end())
}

impl ScenarioGenerator for NearestNeighborGenerator {
    fn name(&self) -> &str {
        "nearest_neighbor"
    }

    fn generate(
        &self,
        ctx: &StrategyContext<'_>,
        sampled: &[NodeId],
        rng: &mut StdRng,
    ) -> Result<Scenario, StrategyError> {
        let mut scenario = Scenario::new(ctx.instance().clone(), ctx.config.unserved_penalty);
        Self::replay_commitments(&mut scenario, ctx.world)?;
        for n in ctx.world.pending() {
            scenario.add_request(n)?;
        }
        for &n in sampled {
            if !scenario.knows(n) {
                scenario.add_sampled(n)?;
            }
        }
        self.construct(&mut scenario, rng)?;
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rand::SeedableRng;

    use crate::config::EngineConfig;
    use crate::models::{Instance, Node, Resource, TimeWindow};
    use crate::world::Commitment;

    fn instance() -> Arc<Instance> {
        Arc::new(
            Instance::builder()
                .resource(Resource::new(0, 100))
                .resource(Resource::new(1, 100).with_home(10.0, 0.0))
                .request(Node::request(0, 1.0, 0.0, 1.0))
                .request(Node::request(1, 2.0, 0.0, 1.0))
                .request(Node::request(2, 8.0, 0.0, 1.0))
                .request(Node::request(3, 9.0, 0.0, 1.0))
                .request(
                    Node::request(4, 500.0, 0.0, 1.0)
                        .with_time_window(TimeWindow::new(0.0, 5.0).expect("valid")),
                )
                .request(Node::request(5, 5.0, 5.0, 1.0).with_release_time(30.0))
                .build()
                .expect("valid"),
        )
    }

    #[test]
    fn test_generate_plans_pending_requests() {
        let mut world = World::new(instance());
        for n in 0..5 {
            world.release(n).expect("valid");
        }
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let mut rng = StdRng::seed_from_u64(42);
        let s = NearestNeighborGenerator::new()
            .generate(&ctx, &[], &mut rng)
            .expect("valid");

        for n in 0..4 {
            assert!(s.plan().contains(n), "request {n} planned");
        }
        // unreachable in time
        assert!(s.is_unassigned(4));
        assert!(!s.knows(5));
        assert!(s.is_feasible());
    }

    #[test]
    fn test_generate_replays_commitments() {
        let mut world = World::new(instance());
        for n in 0..4 {
            world.release(n).expect("valid");
        }
        let visit = world.commit(&Commitment::new(1, 3, 4.0)).expect("valid");
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let mut rng = StdRng::seed_from_u64(7);
        let s = NearestNeighborGenerator::new()
            .generate(&ctx, &[5], &mut rng)
            .expect("valid");

        let plan = s.plan();
        assert!(plan.is_frozen(3));
        assert_eq!(plan.tour(1).expect("tour").frontier(), 3);
        assert_eq!(plan.arrival(3), Some(visit.arrival));
        assert_eq!(plan.departure(3), Some(visit.departure));
        assert!(s.is_sampled(5));
        assert!(s.knows(5));
    }

    #[test]
    fn test_plain_nearest_neighbor_is_deterministic() {
        let mut world = World::new(instance());
        for n in 0..4 {
            world.release(n).expect("valid");
        }
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let g = NearestNeighborGenerator::new().with_breadth(1);
        let a = g.generate(&ctx, &[], &mut StdRng::seed_from_u64(1)).expect("valid");
        let b = g.generate(&ctx, &[], &mut StdRng::seed_from_u64(1)).expect("valid");
        assert_eq!(a.plan().route(0), b.plan().route(0));
        assert_eq!(a.plan().route(1), b.plan().route(1));
    }
}
