use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::components::{RequestSampler, StrategyContext};
use crate::models::NodeId;

/// Draws hypothetical requests uniformly among the requests that are not
/// released yet and whose release time lies in the future.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRequestSampler;

impl RequestSampler for UniformRequestSampler {
    fn name(&self) -> &str {
        "uniform"
    }

    fn sample(&self, ctx: &StrategyContext<'_>, count: usize, rng: &mut StdRng) -> Vec<NodeId> {
        let now = ctx.time();
        let instance = ctx.instance();
        let candidates: Vec<NodeId> = ctx
            .world
            .unreleased()
            .filter(|&n| instance.node(n).is_some_and(|node| node.release_time() > now))
            .collect();
        candidates.choose_multiple(rng, count).copied().collect()
    }
}
