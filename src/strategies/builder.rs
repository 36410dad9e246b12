//! Distinguished-solution builders.
//!
//! Which scenario drives the next decisions is a policy, not core behaviour;
//! both builders implement [`SolutionBuilder`] and are interchangeable.

use std::collections::HashMap;

use crate::components::{DistinguishedSolution, NextAction, SolutionBuilder, StrategyContext};
use crate::plan::Scenario;

/// Consensus over the pool.
///
/// Every scenario votes for its next action of each resource with weight
/// `best_cost / scenario_cost`. The scenario whose actions gather the
/// highest summed score is the distinguished one; ties go to the cheaper
/// scenario.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusBuilder;

impl SolutionBuilder for ConsensusBuilder {
    fn name(&self) -> &str {
        "consensus"
    }

    fn build(&self, _ctx: &StrategyContext<'_>, scenarios: &[&Scenario]) -> DistinguishedSolution {
        let best_cost = scenarios
            .iter()
            .map(|s| s.cost())
            .fold(f64::INFINITY, f64::min);
        let proposals: Vec<DistinguishedSolution> = scenarios
            .iter()
            .map(|s| DistinguishedSolution::from_scenario(s))
            .collect();

        let mut votes: HashMap<(usize, NextAction), f64> = HashMap::new();
        for (s, proposal) in scenarios.iter().zip(&proposals) {
            let weight = if s.cost() > 0.0 { best_cost / s.cost() } else { 1.0 };
            for (r, &action) in proposal.actions().iter().enumerate() {
                *votes.entry((r, action)).or_default() += weight;
            }
        }

        let score = |p: &DistinguishedSolution| -> f64 {
            p.actions()
                .iter()
                .enumerate()
                .map(|(r, &a)| votes.get(&(r, a)).copied().unwrap_or_default())
                .sum()
        };
        proposals
            .into_iter()
            .map(|p| (score(&p), p))
            .max_by(|a, b| {
                let cost = |p: &DistinguishedSolution| p.cost().unwrap_or(f64::INFINITY);
                a.0.total_cmp(&b.0).then(cost(&b.1).total_cmp(&cost(&a.1)))
            })
            .map(|(_, p)| p)
            .unwrap_or_default()
    }
}

/// The cheapest scenario decides alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestScenarioBuilder;

impl SolutionBuilder for BestScenarioBuilder {
    fn name(&self) -> &str {
        "best_scenario"
    }

    fn build(&self, _ctx: &StrategyContext<'_>, scenarios: &[&Scenario]) -> DistinguishedSolution {
        scenarios
            .iter()
            .min_by(|a, b| a.cost().total_cmp(&b.cost()))
            .map(|s| DistinguishedSolution::from_scenario(s))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::EngineConfig;
    use crate::models::{Instance, Node, Resource};
    use crate::world::World;

    fn instance() -> Arc<Instance> {
        Arc::new(
            Instance::builder()
                .resource(Resource::new(0, 10))
                .request(Node::request(0, 3.0, 0.0, 0.0))
                .request(Node::request(1, 0.0, 1.0, 0.0))
                .request(Node::request(2, 0.0, 9.0, 0.0))
                .build()
                .expect("valid"),
        )
    }

    /// A single-tour scenario visiting `order`.
    fn scenario(instance: &Arc<Instance>, order: &[usize]) -> Scenario {
        let mut s = Scenario::new(instance.clone(), 100.0);
        let mut pred = s.plan().tour(0).expect("tour").start();
        for &n in order {
            s.add_request(n).expect("valid");
            s.insert_after(pred, n).expect("valid");
            pred = n;
        }
        s
    }

    #[test]
    fn test_consensus_follows_majority() {
        let instance = instance();
        let world = World::new(instance.clone());
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);

        // cheapest scenario starts with 1; two slightly worse ones start with 0
        let best = scenario(&instance, &[1, 2, 0]);
        let a = scenario(&instance, &[0, 1, 2]);
        let b = scenario(&instance, &[0, 1, 2]);
        assert!(best.cost() < a.cost());

        let consensus = ConsensusBuilder.build(&ctx, &[&best, &a, &b]);
        assert_eq!(consensus.action(0), Some(NextAction::Visit(0)));
        assert_ne!(consensus.source(), Some(best.id()));

        let single = BestScenarioBuilder.build(&ctx, &[&best, &a, &b]);
        assert_eq!(single.source(), Some(best.id()));
        assert_eq!(single.action(0), Some(NextAction::Visit(1)));
    }

    #[test]
    fn test_single_scenario() {
        let instance = instance();
        let world = World::new(instance.clone());
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let s = scenario(&instance, &[2]);
        let sol = ConsensusBuilder.build(&ctx, &[&s]);
        assert_eq!(sol.source(), Some(s.id()));
        assert_eq!(sol.action(0), Some(NextAction::Visit(2)));
    }
}
