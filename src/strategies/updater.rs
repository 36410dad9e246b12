use crate::components::{ScenarioUpdater, StrategyContext, StrategyError};
use crate::models::NodeId;
use crate::plan::Scenario;
use crate::strategies::insertion::cheapest_insertion;
use crate::world::Commitment;

/// Updater based on cheapest feasible insertion.
///
/// - a released request is inserted at its cheapest feasible position; a
///   scenario that already sampled it keeps its position;
/// - a committed request is moved right after the tour's frontier;
/// - a committed home return drops every request still planned after the
///   frontier.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertionUpdater;

impl InsertionUpdater {
    fn serves(scenario: &Scenario, resource: usize, node: NodeId) -> bool {
        scenario.plan().is_frozen(node) && scenario.plan().tour_of(node) == Some(resource)
    }
}

impl ScenarioUpdater for InsertionUpdater {
    fn name(&self) -> &str {
        "insertion"
    }

    fn insert_request(
        &self,
        scenario: &mut Scenario,
        _ctx: &StrategyContext<'_>,
        node: NodeId,
    ) -> Result<bool, StrategyError> {
        scenario.add_request(node)?;
        if scenario.plan().contains(node) {
            return Ok(true);
        }
        match cheapest_insertion(scenario.plan(), node) {
            Some((pred, _)) => {
                scenario.insert_after(pred, node)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn enforce_decision(
        &self,
        scenario: &mut Scenario,
        _ctx: &StrategyContext<'_>,
        commitment: &Commitment,
    ) -> Result<bool, StrategyError> {
        let plan = scenario.plan();
        let Some(tour) = plan.tour(commitment.resource) else {
            return Ok(false);
        };
        let (frontier, end) = (tour.frontier(), tour.end());
        let node = commitment.node;

        if node == end {
            scenario.truncate_after(frontier)?;
            return Ok(true);
        }
        if plan.is_frozen(node) {
            return Ok(false);
        }
        if plan.succ(frontier) == Some(node) {
            return Ok(true);
        }
        if !scenario.knows(node) {
            scenario.add_request(node)?;
        }
        if scenario.plan().contains(node) {
            scenario.relocate_after(frontier, node)?;
        } else {
            scenario.insert_after(frontier, node)?;
        }
        Ok(true)
    }

    fn start_of_service(
        &self,
        scenario: &mut Scenario,
        _ctx: &StrategyContext<'_>,
        resource: usize,
        node: NodeId,
    ) -> Result<bool, StrategyError> {
        Ok(Self::serves(scenario, resource, node))
    }

    fn end_of_service(
        &self,
        scenario: &mut Scenario,
        _ctx: &StrategyContext<'_>,
        resource: usize,
        node: NodeId,
    ) -> Result<bool, StrategyError> {
        Ok(Self::serves(scenario, resource, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::EngineConfig;
    use crate::models::{Instance, Node, Resource, TimeWindow};
    use crate::world::World;

    fn setup() -> (World, Scenario) {
        let instance = Arc::new(
            Instance::builder()
                .resource(Resource::new(0, 100))
                .resource(Resource::new(1, 100).with_home(10.0, 0.0))
                .request(Node::request(0, 1.0, 0.0, 0.0))
                .request(Node::request(1, 2.0, 0.0, 0.0))
                .request(Node::request(2, 9.0, 0.0, 0.0))
                .request(
                    Node::request(3, 300.0, 0.0, 0.0)
                        .with_time_window(TimeWindow::new(0.0, 1.0).expect("valid")),
                )
                .build()
                .expect("valid"),
        );
        let mut s = Scenario::new(instance.clone(), 100.0);
        let start = s.plan().tour(0).expect("tour").start();
        s.add_request(0).expect("valid");
        s.insert_after(start, 0).expect("valid");
        s.add_request(1).expect("valid");
        s.insert_after(0, 1).expect("valid");
        (World::new(instance), s)
    }

    #[test]
    fn test_insert_request() {
        let (world, mut s) = setup();
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        assert!(InsertionUpdater.insert_request(&mut s, &ctx, 2).expect("valid"));
        assert_eq!(s.plan().tour_of(2), Some(1));
        assert!(!InsertionUpdater.insert_request(&mut s, &ctx, 3).expect("valid"));
        assert!(s.is_unassigned(3));
    }

    #[test]
    fn test_insert_sampled_request_keeps_position() {
        let (world, mut s) = setup();
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        s.add_sampled(2).expect("valid");
        s.insert_after(1, 2).expect("valid");
        assert!(InsertionUpdater.insert_request(&mut s, &ctx, 2).expect("valid"));
        assert!(!s.is_sampled(2));
        assert_eq!(s.plan().tour_of(2), Some(0));
    }

    #[test]
    fn test_enforce_relocates_committed_node() {
        let (world, mut s) = setup();
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let start = s.plan().tour(0).expect("tour").start();
        let c = Commitment::new(0, 1, 0.0);
        assert!(InsertionUpdater.enforce_decision(&mut s, &ctx, &c).expect("valid"));
        assert_eq!(s.plan().pred(1), Some(start));
        assert_eq!(s.plan().route(0), vec![1, 0]);

        // across tours
        let c = Commitment::new(1, 0, 0.0);
        assert!(InsertionUpdater.enforce_decision(&mut s, &ctx, &c).expect("valid"));
        assert_eq!(s.plan().tour_of(0), Some(1));
    }

    #[test]
    fn test_enforce_unknown_request_is_inserted() {
        let (world, mut s) = setup();
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let c = Commitment::new(1, 2, 0.0);
        assert!(InsertionUpdater.enforce_decision(&mut s, &ctx, &c).expect("valid"));
        assert_eq!(s.plan().route(1), vec![2]);
    }

    #[test]
    fn test_enforce_home_return_truncates() {
        let (world, mut s) = setup();
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let end = s.plan().tour(0).expect("tour").end();
        let c = Commitment::new(0, end, 0.0);
        assert!(InsertionUpdater.enforce_decision(&mut s, &ctx, &c).expect("valid"));
        assert!(s.plan().route(0).is_empty());
        assert_eq!(s.num_unassigned(), 2);
    }

    #[test]
    fn test_enforce_frozen_elsewhere_fails() {
        let (world, mut s) = setup();
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        s.freeze(0, 1.0, 1.0).expect("valid");
        let c = Commitment::new(1, 0, 0.0);
        assert!(!InsertionUpdater.enforce_decision(&mut s, &ctx, &c).expect("valid"));
        assert!(InsertionUpdater
            .start_of_service(&mut s, &ctx, 0, 0)
            .expect("valid"));
        assert!(!InsertionUpdater
            .end_of_service(&mut s, &ctx, 1, 0)
            .expect("valid"));
    }
}
