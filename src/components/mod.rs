//! Pluggable strategy roles invoked by the [`ComponentManager`](crate::manager::ComponentManager).
//!
//! Every role is a trait object so that problem-specific implementations can
//! be swapped without touching the orchestrator. Reference implementations
//! live in [`strategies`](crate::strategies).
//!
//! | Role | Trait |
//! |------|-------|
//! | Generator | [`ScenarioGenerator`] |
//! | Optimizer | [`ScenarioOptimizer`] |
//! | Updater | [`ScenarioUpdater`] |
//! | Validator | [`RequestValidator`] |
//! | Pool cleaner | [`PoolCleaner`] |
//! | Request sampler | [`RequestSampler`] |
//! | Solution builder | [`SolutionBuilder`] |

mod context;
mod solution;

pub use context::{StrategyContext, StrategyError};
pub use solution::{DistinguishedSolution, NextAction};

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rand::rngs::StdRng;

use crate::manager::Budget;
use crate::models::NodeId;
use crate::plan::{Scenario, ScenarioId};
use crate::strategies::{
    AlnsOptimizer, ConsensusBuilder, ConsistencyCleaner, InsertionUpdater, InsertionValidator,
    NearestNeighborGenerator, UniformRequestSampler,
};
use crate::world::Commitment;

/// Builds new scenarios consistent with the current world.
pub trait ScenarioGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Creates a scenario containing every committed visit and every known
    /// request, plus the `sampled` hypothetical requests.
    fn generate(
        &self,
        ctx: &StrategyContext<'_>,
        sampled: &[NodeId],
        rng: &mut StdRng,
    ) -> Result<Scenario, StrategyError>;
}

/// Improves a single scenario.
pub trait ScenarioOptimizer: Send + Sync {
    fn name(&self) -> &str;

    /// Brings a fresh scenario to an initial state; `false` means it could
    /// not be made feasible and is discarded.
    fn initialize(
        &self,
        scenario: &mut Scenario,
        ctx: &StrategyContext<'_>,
        budget: Budget,
        rng: &mut StdRng,
    ) -> Result<bool, StrategyError>;

    /// Improves the scenario until the budget runs out or `preempt` is
    /// raised. Maintains the scenario's age.
    fn optimize(
        &self,
        scenario: &mut Scenario,
        ctx: &StrategyContext<'_>,
        budget: Budget,
        preempt: &Arc<AtomicBool>,
        rng: &mut StdRng,
    ) -> Result<bool, StrategyError>;
}

/// Keeps scenarios consistent with real-time events.
///
/// Returning `false` means the scenario cannot accommodate the event.
pub trait ScenarioUpdater: Send + Sync {
    fn name(&self) -> &str;

    /// A request was released.
    fn insert_request(
        &self,
        scenario: &mut Scenario,
        ctx: &StrategyContext<'_>,
        node: NodeId,
    ) -> Result<bool, StrategyError>;

    /// Makes the committed node the next visit of the committed resource.
    /// Freezing is done by the orchestrator afterwards.
    fn enforce_decision(
        &self,
        scenario: &mut Scenario,
        ctx: &StrategyContext<'_>,
        commitment: &Commitment,
    ) -> Result<bool, StrategyError>;

    fn start_service(
        &self,
        _scenario: &mut Scenario,
        _ctx: &StrategyContext<'_>,
        _resource: usize,
    ) -> Result<bool, StrategyError> {
        Ok(true)
    }

    fn stop_service(
        &self,
        _scenario: &mut Scenario,
        _ctx: &StrategyContext<'_>,
        _resource: usize,
    ) -> Result<bool, StrategyError> {
        Ok(true)
    }

    fn start_of_service(
        &self,
        _scenario: &mut Scenario,
        _ctx: &StrategyContext<'_>,
        _resource: usize,
        _node: NodeId,
    ) -> Result<bool, StrategyError> {
        Ok(true)
    }

    fn end_of_service(
        &self,
        _scenario: &mut Scenario,
        _ctx: &StrategyContext<'_>,
        _resource: usize,
        _node: NodeId,
    ) -> Result<bool, StrategyError> {
        Ok(true)
    }
}

/// Decides whether new requests are accepted.
pub trait RequestValidator: Send + Sync {
    fn name(&self) -> &str;

    fn is_compatible(&self, scenario: &Scenario, ctx: &StrategyContext<'_>, node: NodeId) -> bool;

    fn request_accepted(&self, _node: NodeId) {}

    fn request_rejected(&self, _node: NodeId) {}
}

/// Picks scenarios to drop from the pool.
pub trait PoolCleaner: Send + Sync {
    fn name(&self) -> &str;

    fn clean(&self, ctx: &StrategyContext<'_>, scenarios: &[&Scenario]) -> Vec<ScenarioId>;
}

/// Draws hypothetical future requests for new scenarios.
pub trait RequestSampler: Send + Sync {
    fn name(&self) -> &str;

    fn sample(&self, ctx: &StrategyContext<'_>, count: usize, rng: &mut StdRng) -> Vec<NodeId>;
}

/// Synthesizes the distinguished solution from the pool.
pub trait SolutionBuilder: Send + Sync {
    fn name(&self) -> &str;

    /// `scenarios` is never empty.
    fn build(&self, ctx: &StrategyContext<'_>, scenarios: &[&Scenario]) -> DistinguishedSolution;
}

/// The seven strategies used by one orchestrator.
pub struct Components {
    pub generator: Box<dyn ScenarioGenerator>,
    pub optimizer: Box<dyn ScenarioOptimizer>,
    pub updater: Box<dyn ScenarioUpdater>,
    pub validator: Box<dyn RequestValidator>,
    pub cleaner: Box<dyn PoolCleaner>,
    pub sampler: Box<dyn RequestSampler>,
    pub builder: Box<dyn SolutionBuilder>,
}

impl Components {
    /// Nearest-neighbour generation, ALNS optimization, cheapest-insertion
    /// updates and a consensus solution builder.
    pub fn reference() -> Self {
        Self {
            generator: Box::new(NearestNeighborGenerator::default()),
            optimizer: Box::new(AlnsOptimizer::default()),
            updater: Box::new(InsertionUpdater),
            validator: Box::new(InsertionValidator),
            cleaner: Box::new(ConsistencyCleaner::default()),
            sampler: Box::new(UniformRequestSampler),
            builder: Box::new(ConsensusBuilder),
        }
    }

    pub fn with_generator(mut self, generator: impl ScenarioGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_optimizer(mut self, optimizer: impl ScenarioOptimizer + 'static) -> Self {
        self.optimizer = Box::new(optimizer);
        self
    }

    pub fn with_updater(mut self, updater: impl ScenarioUpdater + 'static) -> Self {
        self.updater = Box::new(updater);
        self
    }

    pub fn with_validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_cleaner(mut self, cleaner: impl PoolCleaner + 'static) -> Self {
        self.cleaner = Box::new(cleaner);
        self
    }

    pub fn with_sampler(mut self, sampler: impl RequestSampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    pub fn with_builder(mut self, builder: impl SolutionBuilder + 'static) -> Self {
        self.builder = Box::new(builder);
        self
    }
}

impl Default for Components {
    fn default() -> Self {
        Self::reference()
    }
}

impl std::fmt::Debug for Components {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Components")
            .field("generator", &self.generator.name())
            .field("optimizer", &self.optimizer.name())
            .field("updater", &self.updater.name())
            .field("validator", &self.validator.name())
            .field("cleaner", &self.cleaner.name())
            .field("sampler", &self.sampler.name())
            .field("builder", &self.builder.name())
            .finish()
    }
}
