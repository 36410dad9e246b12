use crate::components::{PoolCleaner, StrategyContext};
use crate::evaluation::{ScenarioEvaluator, Violation, ViolationType};
use crate::plan::{Scenario, ScenarioId};
use crate::world::World;

/// Drops scenarios that contradict reality or violate constraints, and
/// optionally scenarios that stopped improving.
///
/// A scenario contradicts the world when the frozen prefix of a tour
/// differs from the resource's committed visits, or when it ignores a known
/// request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyCleaner {
    max_age: Option<u32>,
}

impl ConsistencyCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also drops scenarios whose age exceeds `max_age`.
    pub fn with_max_age(mut self, max_age: u32) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn is_consistent(scenario: &Scenario, world: &World) -> bool {
        let plan = scenario.plan();
        let prefixes_match = (0..plan.tours().len()).all(|r| {
            let frozen = plan.iter(r).take_while(|&n| plan.is_frozen(n));
            frozen.eq(world.committed(r).iter().map(|v| v.node))
        });
        prefixes_match && world.known().all(|n| scenario.knows(n))
    }

    /// Violations the scenario could still avoid: lateness at a frozen node
    /// is a fact of the world, not of the plan.
    fn avoidable(scenario: &Scenario, v: &Violation) -> bool {
        match v.kind {
            ViolationType::TimeWindowViolated { node, .. } => !scenario.plan().is_frozen(node),
            _ => true,
        }
    }
}

impl PoolCleaner for ConsistencyCleaner {
    fn name(&self) -> &str {
        "consistency"
    }

    fn clean(&self, ctx: &StrategyContext<'_>, scenarios: &[&Scenario]) -> Vec<ScenarioId> {
        let evaluator = ScenarioEvaluator::new(ctx.instance());
        scenarios
            .iter()
            .filter(|s| {
                self.max_age.is_some_and(|max| s.age() > max)
                    || !Self::is_consistent(s, ctx.world)
                    || evaluator
                        .evaluate(s.plan())
                        .iter()
                        .any(|v| Self::avoidable(s, v))
            })
            .map(|s| s.id())
            .collect()
    }
}
