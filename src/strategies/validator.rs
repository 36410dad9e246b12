use tracing::debug;

use crate::components::{RequestValidator, StrategyContext};
use crate::models::NodeId;
use crate::plan::Scenario;
use crate::strategies::insertion::cheapest_insertion;

/// A request is compatible with a scenario that already plans it (as a
/// sampled request) or has a feasible position for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertionValidator;

impl RequestValidator for InsertionValidator {
    fn name(&self) -> &str {
        "insertion"
    }

    fn is_compatible(&self, scenario: &Scenario, _ctx: &StrategyContext<'_>, node: NodeId) -> bool {
        scenario.plan().contains(node) || cheapest_insertion(scenario.plan(), node).is_some()
    }

    fn request_accepted(&self, node: NodeId) {
        debug!(node, "request accepted");
    }

    fn request_rejected(&self, node: NodeId) {
        debug!(node, "request rejected");
    }
}
