//! ALNS (Adaptive Large Neighborhood Search) scenario optimizer.
//!
//! - [`ScenarioProblem`] — [`AlnsProblem`](u_metaheur::alns::AlnsProblem) over a scenario
//! - [`destroy`] — Destroy operators (random, worst, related)
//! - [`repair`] — Repair operators (greedy insertion, regret insertion)
//! - [`AlnsOptimizer`] — the optimizer strategy running ALNS in chunks

pub mod destroy;
mod problem;
pub mod repair;

pub use destroy::Removal;
pub use problem::ScenarioProblem;
pub use repair::Insertion;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;
use tracing::trace;
use u_metaheur::alns::{AlnsConfig, AlnsRunner};

use crate::components::{ScenarioOptimizer, StrategyContext, StrategyError};
use crate::manager::{Budget, BudgetClock};
use crate::plan::{Scenario, EPS};

/// Iterations of the first, untimed chunk.
const FIRST_CHUNK: usize = 10;

/// Optimizer strategy: greedy initialization, then ALNS in chunks.
///
/// Between chunks the budget and the preemption flag are checked; the flag
/// is also the runner's cancellation token, so a pending event interrupts a
/// chunk mid-way. Chunk length follows the measured iteration time so that
/// a chunk does not run past the wall-clock budget.
#[derive(Debug, Clone)]
pub struct AlnsOptimizer {
    chunk_iterations: usize,
    min_destroy_degree: f64,
    max_destroy_degree: f64,
}

impl AlnsOptimizer {
    pub fn new() -> Self {
        Self {
            chunk_iterations: 100,
            min_destroy_degree: 0.1,
            max_destroy_degree: 0.4,
        }
    }

    /// ALNS iterations run between two budget checks.
    pub fn with_chunk_iterations(mut self, n: usize) -> Self {
        self.chunk_iterations = n.max(1);
        self
    }

    pub fn with_destroy_degree(mut self, min: f64, max: f64) -> Self {
        self.min_destroy_degree = min;
        self.max_destroy_degree = max;
        self
    }

    /// Iterations of the next chunk: capped by the remaining iterations and,
    /// once a chunk has been timed, by what fits in the remaining time.
    fn chunk_size(&self, clock: &BudgetClock, per_iteration: Option<Duration>) -> usize {
        let remaining = clock.remaining();
        let mut n = match per_iteration {
            Some(per) if !per.is_zero() => {
                let fits = remaining.time_limit().as_secs_f64() / per.as_secs_f64();
                (fits as usize).clamp(1, self.chunk_iterations)
            }
            Some(_) => self.chunk_iterations,
            None => self.chunk_iterations.min(FIRST_CHUNK),
        };
        if let Some(left) = remaining.iteration_limit() {
            n = n.min(left);
        }
        n.max(1)
    }

    fn config(&self, iterations: usize, seed: u64) -> AlnsConfig {
        AlnsConfig::default()
            .with_max_iterations(iterations)
            .with_destroy_degree(self.min_destroy_degree, self.max_destroy_degree)
            .with_seed(seed)
    }
}

impl Default for AlnsOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioOptimizer for AlnsOptimizer {
    fn name(&self) -> &str {
        "alns"
    }

    fn initialize(
        &self,
        scenario: &mut Scenario,
        _ctx: &StrategyContext<'_>,
        budget: Budget,
        _rng: &mut StdRng,
    ) -> Result<bool, StrategyError> {
        let mut clock = budget.start();
        let complete = Insertion::Regret.apply_within(scenario, &mut clock);
        Ok(complete && scenario.is_feasible_ahead())
    }

    fn optimize(
        &self,
        scenario: &mut Scenario,
        _ctx: &StrategyContext<'_>,
        budget: Budget,
        preempt: &Arc<AtomicBool>,
        rng: &mut StdRng,
    ) -> Result<bool, StrategyError> {
        let initial = scenario.cost();
        let mut clock = budget.start();
        let mut per_iteration: Option<Duration> = None;
        while !clock.is_exhausted() && !preempt.load(Ordering::Relaxed) {
            let iterations = self.chunk_size(&clock, per_iteration);
            let problem = ScenarioProblem::new(scenario.clone());
            let started = Instant::now();
            let result = AlnsRunner::run_with_cancel(
                &problem,
                &Removal::ALL,
                &Insertion::ALL,
                &self.config(iterations, rng.random()),
                Some(Arc::clone(preempt)),
            )
            .expect("invalid AlnsConfig");
            per_iteration = Some(started.elapsed() / iterations as u32);
            clock.tick_by(iterations);
            if result.best_cost < scenario.cost() - EPS {
                scenario.adopt(result.best);
            }
            if result.cancelled {
                break;
            }
        }

        if scenario.cost() < initial - EPS {
            scenario.reset_age();
        } else {
            scenario.increment_age();
        }
        trace!(
            scenario = %scenario.id(),
            from = initial,
            to = scenario.cost(),
            iterations = clock.iterations_used(),
            "scenario optimized"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rand::SeedableRng;

    use crate::config::EngineConfig;
    use crate::models::{Instance, Node, Resource};
    use crate::world::World;

    fn setup() -> (World, Scenario) {
        let instance = Arc::new(
            Instance::builder()
                .resource(Resource::new(0, 100))
                .resource(Resource::new(1, 100).with_home(20.0, 0.0))
                .request(Node::request(0, 1.0, 0.0, 0.0))
                .request(Node::request(1, 19.0, 0.0, 0.0))
                .request(Node::request(2, 2.0, 0.0, 0.0))
                .request(Node::request(3, 18.0, 0.0, 0.0))
                .build()
                .expect("valid"),
        );
        let mut s = Scenario::new(instance.clone(), 1000.0);
        // a poor plan: everything on resource 0
        let start = s.plan().tour(0).expect("tour").start();
        let mut pred = start;
        for n in [1, 0, 3, 2] {
            s.add_request(n).expect("valid");
            s.insert_after(pred, n).expect("valid");
            pred = n;
        }
        (World::new(instance), s)
    }

    #[test]
    fn test_initialize_inserts_everything() {
        let (world, s) = setup();
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let mut fresh = Scenario::new(s.instance().clone(), 1000.0);
        for n in 0..4 {
            fresh.add_request(n).expect("valid");
        }
        let mut rng = StdRng::seed_from_u64(1);
        let mut starved = fresh.clone();
        let ok = AlnsOptimizer::new()
            .initialize(&mut fresh, &ctx, Budget::time(Duration::from_secs(10)), &mut rng)
            .expect("valid");
        assert!(ok);
        assert_eq!(fresh.num_unassigned(), 0);

        // no budget: the seed is reported as not initialized
        let ok = AlnsOptimizer::new()
            .initialize(&mut starved, &ctx, Budget::zero(), &mut rng)
            .expect("valid");
        assert!(!ok);
        assert_eq!(starved.num_unassigned(), 4);
    }

    #[test]
    fn test_chunk_size_follows_remaining_budget() {
        let optimizer = AlnsOptimizer::new().with_chunk_iterations(100);
        let clock = Budget::time(Duration::from_secs(10)).start();
        assert_eq!(optimizer.chunk_size(&clock, None), FIRST_CHUNK);
        assert_eq!(optimizer.chunk_size(&clock, Some(Duration::from_secs(2))), 4);
        assert_eq!(optimizer.chunk_size(&clock, Some(Duration::from_secs(60))), 1);
        assert_eq!(optimizer.chunk_size(&clock, Some(Duration::from_nanos(1))), 100);

        let clock = Budget::iterations(3).start();
        assert_eq!(optimizer.chunk_size(&clock, None), 3);
    }

    #[test]
    fn test_optimize_improves_and_keeps_identity() {
        let (world, mut s) = setup();
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let id = s.id();
        let before = s.cost();
        let preempt = Arc::new(AtomicBool::new(false));
        let mut rng = StdRng::seed_from_u64(7);
        let ok = AlnsOptimizer::new()
            .optimize(&mut s, &ctx, Budget::iterations(300), &preempt, &mut rng)
            .expect("valid");
        assert!(ok);
        assert_eq!(s.id(), id);
        assert!(s.cost() < before);
        assert_eq!(s.age(), 0);
        assert_eq!(s.num_unassigned(), 0);
    }

    #[test]
    fn test_optimize_respects_frozen_prefix() {
        let (world, mut s) = setup();
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let a = s.plan().arrival(1).expect("planned");
        s.freeze(1, a, a).expect("valid");
        let preempt = Arc::new(AtomicBool::new(false));
        let mut rng = StdRng::seed_from_u64(7);
        AlnsOptimizer::new()
            .optimize(&mut s, &ctx, Budget::iterations(200), &preempt, &mut rng)
            .expect("valid");
        assert_eq!(s.plan().tour(0).expect("tour").frontier(), 1);
        assert_eq!(s.plan().route(0).first(), Some(&1));
    }

    #[test]
    fn test_preempted_optimize_ages_scenario() {
        let (world, mut s) = setup();
        let config = EngineConfig::default();
        let ctx = StrategyContext::new(&world, &config);
        let before = s.cost();
        let preempt = Arc::new(AtomicBool::new(true));
        let mut rng = StdRng::seed_from_u64(7);
        AlnsOptimizer::new()
            .optimize(
                &mut s,
                &ctx,
                Budget::time(Duration::from_secs(10)),
                &preempt,
                &mut rng,
            )
            .expect("valid");
        assert!((s.cost() - before).abs() < 1e-10);
        assert_eq!(s.age(), 1);
    }
}
