//! ALNS problem definition over a scenario.
//!
//! Implements the [`AlnsProblem`](u_metaheur::alns::AlnsProblem) trait so
//! the ALNS runner can search the unfrozen part of a scenario.

use rand::Rng;
use u_metaheur::alns::AlnsProblem;

use crate::plan::Scenario;

/// ALNS problem starting from a snapshot of a scenario.
///
/// Solutions are scenario clones; their frozen prefixes are carried along
/// and never touched by the operators.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use msa_routing::models::{Instance, Node, Resource};
/// use msa_routing::plan::Scenario;
/// use msa_routing::strategies::alns::{Insertion, Removal, ScenarioProblem};
/// use u_metaheur::alns::{AlnsConfig, AlnsRunner};
///
/// let instance = Arc::new(
///     Instance::builder()
///         .resource(Resource::new(0, 30))
///         .request(Node::request(0, 1.0, 0.0, 0.0))
///         .request(Node::request(1, 2.0, 0.0, 0.0))
///         .request(Node::request(2, 3.0, 0.0, 0.0))
///         .build()
///         .unwrap(),
/// );
/// let mut scenario = Scenario::new(instance, 10_000.0);
/// for n in 0..3 {
///     scenario.add_request(n).unwrap();
/// }
///
/// let problem = ScenarioProblem::new(scenario);
/// let config = AlnsConfig::default().with_max_iterations(50).with_seed(42);
/// let result = AlnsRunner::run(&problem, &[Removal::Random], &[Insertion::Greedy], &config)
///     .expect("invalid AlnsConfig");
/// assert_eq!(result.best.num_unassigned(), 0);
/// assert!((result.best_cost - 6.0).abs() < 1e-10);
/// ```
pub struct ScenarioProblem {
    base: Scenario,
}

impl ScenarioProblem {
    pub fn new(base: Scenario) -> Self {
        Self { base }
    }
}

impl AlnsProblem for ScenarioProblem {
    type Solution = Scenario;

    fn initial_solution<R: Rng>(&self, _rng: &mut R) -> Scenario {
        self.base.clone()
    }

    fn cost(&self, solution: &Scenario) -> f64 {
        solution.cost()
    }
}
