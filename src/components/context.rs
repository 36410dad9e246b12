use std::sync::Arc;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::models::Instance;
use crate::plan::PlanError;
use crate::world::World;

/// Read-only view handed to every strategy call.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub world: &'a World,
    pub config: &'a EngineConfig,
}

impl<'a> StrategyContext<'a> {
    pub fn new(world: &'a World, config: &'a EngineConfig) -> Self {
        Self { world, config }
    }

    pub fn instance(&self) -> &'a Arc<Instance> {
        self.world.instance()
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.world.time()
    }
}

/// Failure of a strategy on one scenario.
///
/// The orchestrator never propagates these: the scenario under operation is
/// dropped from the pool instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("plan operation failed: {0}")]
    Plan(#[from] PlanError),

    #[error("{0}")]
    Failed(String),
}

impl StrategyError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
