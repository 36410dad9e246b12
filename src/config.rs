//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::pool::{EvictionPolicy, LeastDiverse, RejectWhenFull, WorstCost};

/// Which [`EvictionPolicy`] a full pool uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionKind {
    RejectWhenFull,
    #[default]
    WorstCost,
    LeastDiverse,
}

impl EvictionKind {
    pub fn policy(self) -> Box<dyn EvictionPolicy> {
        match self {
            Self::RejectWhenFull => Box::new(RejectWhenFull),
            Self::WorstCost => Box::new(WorstCost),
            Self::LeastDiverse => Box::new(LeastDiverse),
        }
    }
}

/// Configuration of the scenario pool, its budgets and the worker pool.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use msa_routing::config::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_pool_size(20)
///     .with_opt_max_scenario_time(Duration::from_millis(50))
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.initial_pool_target(), 16);
/// assert_eq!(config.optimize_budget(), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of scenarios in the pool.
    pub pool_size: usize,

    /// Share of the pool filled by [`Engine::initialize`](crate::engine::Engine::initialize).
    pub pool_initial_proportion: f64,

    /// Share of the pool generated by one background generation tick.
    pub generation_batch_proportion: f64,

    /// Initialization budget of one new scenario.
    pub gen_max_scenario_time: Duration,

    /// Optimization budget of one scenario.
    pub opt_max_scenario_time: Duration,

    /// Pool-wide optimization budget = factor × per-scenario budget × pool size.
    pub opt_pool_time_factor: f64,

    /// Hypothetical requests drawn for each new scenario.
    pub sampled_request_count: usize,

    /// Share of compatible scenarios needed to accept a request.
    pub min_compatible_proportion: f64,

    /// Worker threads for per-scenario sweeps.
    pub max_threads: usize,

    /// Random seed; a random one is drawn when absent.
    pub seed: Option<u64>,

    pub eviction: EvictionKind,

    /// Cost of each request a scenario leaves unassigned.
    pub unserved_penalty: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: 200,
            pool_initial_proportion: 0.8,
            generation_batch_proportion: 0.2,
            gen_max_scenario_time: Duration::from_secs(5),
            opt_max_scenario_time: Duration::from_secs(60),
            opt_pool_time_factor: 0.5,
            sampled_request_count: 10,
            min_compatible_proportion: 0.5,
            max_threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            seed: None,
            eviction: EvictionKind::default(),
            unserved_penalty: 10_000.0,
        }
    }
}

impl EngineConfig {
    pub fn with_pool_size(mut self, n: usize) -> Self {
        self.pool_size = n;
        self
    }

    pub fn with_pool_initial_proportion(mut self, p: f64) -> Self {
        self.pool_initial_proportion = p;
        self
    }

    pub fn with_generation_batch_proportion(mut self, p: f64) -> Self {
        self.generation_batch_proportion = p;
        self
    }

    pub fn with_gen_max_scenario_time(mut self, d: Duration) -> Self {
        self.gen_max_scenario_time = d;
        self
    }

    pub fn with_opt_max_scenario_time(mut self, d: Duration) -> Self {
        self.opt_max_scenario_time = d;
        self
    }

    pub fn with_opt_pool_time_factor(mut self, f: f64) -> Self {
        self.opt_pool_time_factor = f;
        self
    }

    pub fn with_sampled_request_count(mut self, n: usize) -> Self {
        self.sampled_request_count = n;
        self
    }

    pub fn with_min_compatible_proportion(mut self, p: f64) -> Self {
        self.min_compatible_proportion = p;
        self
    }

    pub fn with_max_threads(mut self, n: usize) -> Self {
        self.max_threads = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_eviction(mut self, kind: EvictionKind) -> Self {
        self.eviction = kind;
        self
    }

    pub fn with_unserved_penalty(mut self, penalty: f64) -> Self {
        self.unserved_penalty = penalty;
        self
    }

    /// Number of scenarios the initial fill aims for.
    pub fn initial_pool_target(&self) -> usize {
        (self.pool_size as f64 * self.pool_initial_proportion).round() as usize
    }

    /// Number of scenarios one background generation tick aims for.
    pub fn generation_batch(&self) -> usize {
        ((self.pool_size as f64 * self.generation_batch_proportion).round() as usize).max(1)
    }

    /// Wall-clock budget of one pool-wide optimization tick.
    pub fn optimize_budget(&self) -> Duration {
        self.opt_max_scenario_time
            .mul_f64(self.pool_size as f64 * self.opt_pool_time_factor)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: &str| Err(EngineError::InvalidConfig(msg.into()));
        let unit = |p: f64| (0.0..=1.0).contains(&p);
        if self.pool_size == 0 {
            return invalid("pool_size must be > 0");
        }
        if !unit(self.pool_initial_proportion) {
            return invalid("pool_initial_proportion must be in [0, 1]");
        }
        if !unit(self.generation_batch_proportion) {
            return invalid("generation_batch_proportion must be in [0, 1]");
        }
        if !unit(self.min_compatible_proportion) {
            return invalid("min_compatible_proportion must be in [0, 1]");
        }
        if !(self.opt_pool_time_factor.is_finite() && self.opt_pool_time_factor >= 0.0) {
            return invalid("opt_pool_time_factor must be finite and >= 0");
        }
        if self.max_threads == 0 {
            return invalid("max_threads must be > 0");
        }
        if !(self.unserved_penalty.is_finite() && self.unserved_penalty >= 0.0) {
            return invalid("unserved_penalty must be finite and >= 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.pool_size, 200);
        assert_eq!(c.initial_pool_target(), 160);
        assert_eq!(c.generation_batch(), 40);
        assert_eq!(c.optimize_budget(), Duration::from_secs(6000));
        assert_eq!(c.eviction, EvictionKind::WorstCost);
        assert!(c.max_threads >= 1);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_invalid() {
        let cases = [
            EngineConfig::default().with_pool_size(0),
            EngineConfig::default().with_pool_initial_proportion(1.5),
            EngineConfig::default().with_min_compatible_proportion(-0.1),
            EngineConfig::default().with_generation_batch_proportion(f64::NAN),
            EngineConfig::default().with_max_threads(0),
            EngineConfig::default().with_unserved_penalty(f64::INFINITY),
            EngineConfig::default().with_opt_pool_time_factor(-1.0),
        ];
        for c in cases {
            assert!(
                matches!(c.validate(), Err(EngineError::InvalidConfig(_))),
                "{c:?}"
            );
        }
    }

    #[test]
    fn test_generation_batch_is_at_least_one() {
        let c = EngineConfig::default().with_pool_size(2);
        assert_eq!(c.generation_batch(), 1);
    }

    #[test]
    fn test_eviction_kind_policy() {
        assert_eq!(EvictionKind::RejectWhenFull.policy().name(), "reject_when_full");
        assert_eq!(EvictionKind::LeastDiverse.policy().name(), "least_diverse");
    }

    #[test]
    fn test_serde_roundtrip() {
        let c = EngineConfig::default()
            .with_pool_size(12)
            .with_seed(3)
            .with_eviction(EvictionKind::LeastDiverse);
        let json = serde_json::to_string(&c).expect("serialize");
        let back: EngineConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, c);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: EngineConfig = serde_json::from_str(r#"{"pool_size": 7}"#).expect("deserialize");
        assert_eq!(c.pool_size, 7);
        assert_eq!(c.sampled_request_count, 10);
    }
}
