//! The orchestrator: the only entry point through which events and
//! background ticks touch the scenario pool.
//!
//! Every strategy call goes through [`ComponentManager`]. Per-scenario work
//! runs in parallel on the manager's worker pool; scenarios that fail a sweep
//! (the strategy refuses, errors, or panics) are collected and removed from
//! the pool in one batch once the sweep is complete.
//!
//! - [`Budget`] / [`BudgetClock`] — wall-clock and iteration limits
//! - [`SweepReport`] / [`AdmissionReport`] — what a sweep removed and why

mod budget;
mod report;

pub use budget::{Budget, BudgetClock};
pub use report::{AdmissionReport, FailureCause, SweepReport};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::components::{Components, DistinguishedSolution, StrategyContext, StrategyError};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::{Instance, NodeId};
use crate::monitor::{MonitorKind, Telemetry};
use crate::plan::{PlanError, Scenario, ScenarioId};
use crate::pool::{ScenarioPool, SharedScenario};
use crate::world::{Commitment, RequestStatus, World};

/// Orchestrates the strategies over the scenario pool.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::AtomicBool;
/// use std::sync::Arc;
/// use std::time::Duration;
/// use msa_routing::components::Components;
/// use msa_routing::config::EngineConfig;
/// use msa_routing::manager::{Budget, ComponentManager};
/// use msa_routing::models::{Instance, Node, Resource};
/// use msa_routing::monitor::Telemetry;
///
/// let instance = Instance::builder()
///     .resource(Resource::new(0, 100))
///     .request(Node::request(0, 5.0, 0.0, 1.0))
///     .request(Node::request(1, 0.0, 5.0, 1.0))
///     .build()
///     .unwrap();
/// let config = EngineConfig::default().with_pool_size(3).with_max_threads(1).with_seed(1);
/// let mut manager =
///     ComponentManager::new(Arc::new(instance), config, Components::reference(), Telemetry::default())
///         .unwrap();
///
/// manager.insert_requests(&[0, 1]).unwrap();
/// let budget = Budget::time(Duration::from_secs(5)).with_iterations(10);
/// manager.generate_scenarios(budget, &AtomicBool::new(false));
/// assert_eq!(manager.pool().size(), 3);
/// assert!(!manager.build_distinguished_plan().is_none());
/// ```
pub struct ComponentManager {
    config: EngineConfig,
    components: Components,
    pool: ScenarioPool,
    world: World,
    workers: ThreadPool,
    rng: StdRng,
    telemetry: Telemetry,
}

impl ComponentManager {
    pub fn new(
        instance: Arc<Instance>,
        config: EngineConfig,
        components: Components,
        telemetry: Telemetry,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let workers = ThreadPoolBuilder::new()
            .num_threads(config.max_threads)
            .thread_name(|i| format!("msa-worker-{i}"))
            .build()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let pool = ScenarioPool::with_eviction(config.pool_size, config.eviction.policy());
        debug!(
            parent: telemetry.span(),
            seed,
            pool_size = config.pool_size,
            threads = config.max_threads,
            components = ?components,
            "component manager created"
        );
        Ok(Self {
            config,
            components,
            pool,
            world: World::new(instance),
            workers,
            rng: StdRng::seed_from_u64(seed),
            telemetry,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub fn pool(&self) -> &ScenarioPool {
        &self.pool
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn context(&self) -> StrategyContext<'_> {
        StrategyContext::new(&self.world, &self.config)
    }

    /// Moves the simulation clock forward. Returns `false` if `t` is not
    /// later than the current time.
    pub fn advance_time(&mut self, t: f64) -> bool {
        let advanced = self.world.advance_to(t);
        if advanced {
            self.telemetry
                .publish(MonitorKind::TimeChanged, t, format!("time is now {t}"));
        }
        advanced
    }

    /// Fills the pool up to its capacity. See [`generate_up_to`](Self::generate_up_to).
    pub fn generate_scenarios(&mut self, budget: Budget, preempt: &AtomicBool) -> usize {
        self.generate_up_to(self.pool.capacity(), budget, preempt)
    }

    /// Generates scenarios until the pool holds `target` of them, the budget
    /// is exhausted (each generated scenario counts as one iteration) or
    /// `preempt` is raised. Scenarios the optimizer cannot initialize are
    /// discarded. Returns how many scenarios were admitted.
    pub fn generate_up_to(&mut self, target: usize, budget: Budget, preempt: &AtomicBool) -> usize {
        let target = target.min(self.pool.capacity());
        let mut clock = budget.start();
        let mut added = 0;

        while self.pool.size() < target && !clock.is_exhausted() && !preempt.load(Ordering::Acquire) {
            let remaining = clock.remaining();
            let mut wave = (target - self.pool.size()).min(self.config.max_threads);
            if let Some(n) = remaining.iteration_limit() {
                wave = wave.min(n);
            }
            let sub = Budget::time(self.config.gen_max_scenario_time)
                .min(Budget::time(remaining.time_limit()));
            let seeds = self.seeds(wave);

            let (components, config) = (&self.components, &self.config);
            let ctx = StrategyContext::new(&self.world, config);
            let results: Vec<Result<Option<Scenario>, FailureCause>> = self.workers.install(|| {
                seeds
                    .into_par_iter()
                    .map(|seed| {
                        let mut rng = StdRng::seed_from_u64(seed);
                        guarded(|| {
                            let count = config.sampled_request_count;
                            let sampled = components.sampler.sample(&ctx, count, &mut rng);
                            let mut scenario =
                                components.generator.generate(&ctx, &sampled, &mut rng)?;
                            let optimizer = &components.optimizer;
                            let feasible = optimizer.initialize(&mut scenario, &ctx, sub, &mut rng)?;
                            Ok(feasible.then_some(scenario))
                        })
                    })
                    .collect()
            });
            clock.tick_by(wave);

            for result in results {
                match result {
                    Ok(Some(scenario)) => {
                        if self.pool.add(scenario) {
                            added += 1;
                        }
                    }
                    Ok(None) => debug!(parent: self.telemetry.span(), "infeasible seed discarded"),
                    Err(cause) => warn!(
                        parent: self.telemetry.span(),
                        ?cause,
                        "scenario generation failed"
                    ),
                }
            }
        }

        debug!(
            parent: self.telemetry.span(),
            added,
            size = self.pool.size(),
            elapsed_ms = clock.elapsed().as_millis() as u64,
            "scenarios generated"
        );
        added
    }

    /// Optimizes the pool, least-recently-improved scenarios first.
    ///
    /// Scenarios are handed out in waves of `max_threads`; the budget and
    /// `preempt` are checked before each wave and before each scenario, and
    /// `preempt` is also passed down to the optimizer. A scenario the
    /// optimizer fails on is removed.
    pub fn optimize_pool(&mut self, budget: Budget, preempt: &Arc<AtomicBool>) -> SweepReport {
        let mut clock = budget.start();
        let mut members = self.pool.snapshot();
        members.sort_by_key(|m| m.age());
        let per_scenario = Budget::time(self.config.opt_max_scenario_time);
        let mut failures = Vec::new();

        for wave in members.chunks(self.config.max_threads) {
            if clock.is_exhausted() || preempt.load(Ordering::Acquire) {
                break;
            }
            let sub = per_scenario.min(Budget::time(clock.remaining().time_limit()));
            let seeds = self.seeds(wave.len());
            let optimizer = &*self.components.optimizer;
            let ctx = StrategyContext::new(&self.world, &self.config);
            let wave_failures: Vec<(ScenarioId, FailureCause)> = self.workers.install(|| {
                wave.par_iter()
                    .zip(seeds)
                    .filter_map(|(member, seed)| {
                        if preempt.load(Ordering::Acquire) {
                            return None;
                        }
                        let mut rng = StdRng::seed_from_u64(seed);
                        let mut scenario = member.lock();
                        let outcome = guarded(|| {
                            optimizer.optimize(&mut scenario, &ctx, sub, preempt, &mut rng)
                        });
                        failure(member.id(), outcome)
                    })
                    .collect()
            });
            failures.extend(wave_failures);
            clock.tick_by(wave.len());
        }
        self.finish("optimize", failures)
    }

    /// Admits new requests.
    ///
    /// A request is accepted when at least `min_compatible_proportion` of the
    /// pool is compatible with it (an empty pool accepts everything). Accepted
    /// requests are released in the world and inserted into every scenario;
    /// rejected ones never touch the pool. Requests that are not unreleased
    /// any more are skipped.
    pub fn insert_requests(&mut self, nodes: &[NodeId]) -> Result<AdmissionReport, EngineError> {
        if let Some(&n) = nodes.iter().find(|&&n| !self.world.instance().is_request(n)) {
            return Err(EngineError::UnknownNode(n));
        }
        let mut report = AdmissionReport::default();
        let members = self.pool.snapshot();
        let now = self.world.time();

        for &node in nodes {
            if self.world.status(node) != Some(RequestStatus::Unreleased) {
                debug!(parent: self.telemetry.span(), node, "request already known");
                continue;
            }
            self.telemetry
                .publish(MonitorKind::NewRequest, now, format!("request {node} arrived"));
            let compatible = self.compatibility(&members, node);
            if compatible >= self.config.min_compatible_proportion {
                self.world.release(node)?;
                self.components.validator.request_accepted(node);
                self.telemetry.publish(
                    MonitorKind::RequestReleased,
                    now,
                    format!("request {node} released ({:.0}% compatible)", compatible * 100.0),
                );
                report.accepted.push(node);
            } else {
                self.world.reject(node)?;
                self.components.validator.request_rejected(node);
                self.telemetry.publish(
                    MonitorKind::RequestRejected,
                    now,
                    format!("request {node} rejected ({:.0}% compatible)", compatible * 100.0),
                );
                report.rejected.push(node);
            }
        }

        if !report.accepted.is_empty() {
            let accepted = &report.accepted;
            let updater = &*self.components.updater;
            report.sweep = self.sweep("insert_request", |scenario, ctx| {
                for &node in accepted {
                    if !updater.insert_request(scenario, ctx, node)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            });
        }
        info!(
            parent: self.telemetry.span(),
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            removed = report.sweep.removed.len(),
            "requests admitted"
        );
        Ok(report)
    }

    /// Enforces an irrevocable decision in every scenario.
    ///
    /// The world records the visit first; a malformed commitment is refused
    /// before any scenario is touched. Each scenario must then plan the node
    /// right after the resource's last committed node; the node is frozen at
    /// the world's schedule, the tour is cut back where the new schedule made
    /// it infeasible, and the displaced requests are offered for reinsertion.
    /// A scenario that cannot follow, or whose frozen node ends up late, is
    /// removed.
    ///
    /// Returns [`EngineError::PoolExhausted`] when the commitment removed the
    /// last scenario of a non-empty pool.
    pub fn enforce_decision(&mut self, commitment: Commitment) -> Result<SweepReport, EngineError> {
        let visit = self.world.validate(&commitment)?;
        let Some(prev) = self
            .world
            .resource(commitment.resource)
            .and_then(|r| r.last_visit())
            .map(|v| v.node)
        else {
            return Err(EngineError::UnknownResource(commitment.resource));
        };
        self.world.commit(&commitment)?;
        let had_scenarios = !self.pool.is_empty();

        let Commitment { resource, node, .. } = commitment;
        let updater = &*self.components.updater;
        let report = self.sweep("enforce_decision", |scenario, ctx| {
            if !updater.enforce_decision(scenario, ctx, &commitment)? {
                return Ok(false);
            }
            if scenario.plan().pred(node) != Some(prev) {
                return Ok(false);
            }
            scenario.freeze(node, visit.arrival, visit.departure)?;
            match scenario.repair_infeasible(resource) {
                Err(PlanError::FrozenNodeViolation(_)) => return Ok(false),
                other => {
                    other?;
                }
            }
            let displaced: Vec<NodeId> = scenario.unassigned_actual().collect();
            for n in displaced {
                // a request no scenario position fits stays unassigned
                updater.insert_request(scenario, ctx, n)?;
            }
            Ok(true)
        });

        info!(
            parent: self.telemetry.span(),
            resource,
            node,
            arrival = visit.arrival,
            removed = report.removed.len(),
            survivors = self.pool.size(),
            "decision enforced"
        );
        self.telemetry.publish(
            MonitorKind::NodeAssigned,
            visit.arrival,
            format!("resource {resource} visits node {node} at {}", visit.arrival),
        );
        if had_scenarios && self.pool.is_empty() {
            warn!(parent: self.telemetry.span(), resource, node, "pool exhausted");
            return Err(EngineError::PoolExhausted { resource, node });
        }
        Ok(report)
    }

    /// The resource becomes active.
    pub fn start_service(&mut self, resource: usize) -> Result<SweepReport, EngineError> {
        self.world.start_service(resource)?;
        let updater = &*self.components.updater;
        Ok(self.sweep("start_service", |scenario, ctx| {
            updater.start_service(scenario, ctx, resource)
        }))
    }

    /// The resource becomes idle.
    pub fn stop_service(&mut self, resource: usize) -> Result<SweepReport, EngineError> {
        self.world.stop_service(resource)?;
        let updater = &*self.components.updater;
        Ok(self.sweep("stop_service", |scenario, ctx| {
            updater.stop_service(scenario, ctx, resource)
        }))
    }

    /// Service of a committed request begins at time `t`.
    pub fn start_of_service(&mut self, resource: usize, node: NodeId, t: f64) -> Result<SweepReport, EngineError> {
        let before = self.world.time();
        self.world.start_of_service(resource, node, t)?;
        self.clock_moved(before);
        let updater = &*self.components.updater;
        Ok(self.sweep("start_of_service", |scenario, ctx| {
            updater.start_of_service(scenario, ctx, resource, node)
        }))
    }

    /// Service of a committed request ends at time `t`; the request is served.
    pub fn end_of_service(&mut self, resource: usize, node: NodeId, t: f64) -> Result<SweepReport, EngineError> {
        let before = self.world.time();
        self.world.end_of_service(resource, node, t)?;
        self.clock_moved(before);
        self.telemetry.publish(
            MonitorKind::NodeServed,
            self.world.time(),
            format!("resource {resource} served node {node}"),
        );
        let updater = &*self.components.updater;
        Ok(self.sweep("end_of_service", |scenario, ctx| {
            updater.end_of_service(scenario, ctx, resource, node)
        }))
    }

    /// Lets the pool cleaner drop scenarios.
    pub fn clean_pool(&mut self) -> SweepReport {
        let members = self.pool.snapshot();
        let outcome = {
            let guards: Vec<_> = members.iter().map(|m| m.lock()).collect();
            let scenarios: Vec<&Scenario> = guards.iter().map(|g| &**g).collect();
            let ctx = self.context();
            let cleaner = &*self.components.cleaner;
            panic::catch_unwind(AssertUnwindSafe(|| cleaner.clean(&ctx, &scenarios)))
        };
        let failures = match outcome {
            Ok(ids) => ids.into_iter().map(|id| (id, FailureCause::Rejected)).collect(),
            Err(payload) => {
                warn!(
                    parent: self.telemetry.span(),
                    cause = %panic_message(payload.as_ref()),
                    "pool cleaner panicked"
                );
                Vec::new()
            }
        };
        self.finish("clean_pool", failures)
    }

    /// Synthesizes the distinguished solution from the current pool.
    ///
    /// An empty pool, or a panicking builder, yields
    /// [`DistinguishedSolution::none`].
    pub fn build_distinguished_plan(&self) -> DistinguishedSolution {
        let members = self.pool.snapshot();
        if members.is_empty() {
            return DistinguishedSolution::none();
        }
        let guards: Vec<_> = members.iter().map(|m| m.lock()).collect();
        let scenarios: Vec<&Scenario> = guards.iter().map(|g| &**g).collect();
        let ctx = self.context();
        let builder = &*self.components.builder;
        match panic::catch_unwind(AssertUnwindSafe(|| builder.build(&ctx, &scenarios))) {
            Ok(solution) => solution,
            Err(payload) => {
                warn!(
                    parent: self.telemetry.span(),
                    cause = %panic_message(payload.as_ref()),
                    "solution builder panicked"
                );
                DistinguishedSolution::none()
            }
        }
    }

    /// One seed per parallel task, drawn from the manager's stream.
    fn seeds(&mut self, n: usize) -> Vec<u64> {
        (0..n).map(|_| self.rng.random()).collect()
    }

    fn clock_moved(&self, before: f64) {
        let now = self.world.time();
        if now > before {
            self.telemetry
                .publish(MonitorKind::TimeChanged, now, format!("time is now {now}"));
        }
    }

    fn compatibility(&self, members: &[Arc<SharedScenario>], node: NodeId) -> f64 {
        if members.is_empty() {
            return 1.0;
        }
        let ctx = self.context();
        let validator = &*self.components.validator;
        let compatible = self.workers.install(|| {
            members
                .par_iter()
                .filter(|member| {
                    let scenario = member.lock();
                    panic::catch_unwind(AssertUnwindSafe(|| {
                        validator.is_compatible(&scenario, &ctx, node)
                    }))
                    .unwrap_or(false)
                })
                .count()
        });
        compatible as f64 / members.len() as f64
    }

    /// Runs `f` on every scenario in parallel and removes the failures.
    fn sweep<F>(&self, op: &'static str, f: F) -> SweepReport
    where
        F: Fn(&mut Scenario, &StrategyContext<'_>) -> Result<bool, StrategyError> + Sync,
    {
        let members = self.pool.snapshot();
        let ctx = self.context();
        let failures: Vec<(ScenarioId, FailureCause)> = self.workers.install(|| {
            members
                .par_iter()
                .filter_map(|member| {
                    let mut scenario = member.lock();
                    failure(member.id(), guarded(|| f(&mut scenario, &ctx)))
                })
                .collect()
        });
        self.finish(op, failures)
    }

    fn finish(&self, op: &'static str, failures: Vec<(ScenarioId, FailureCause)>) -> SweepReport {
        for (id, cause) in &failures {
            match cause {
                FailureCause::Rejected => {
                    debug!(parent: self.telemetry.span(), op, scenario = %id, "scenario rejected")
                }
                FailureCause::Strategy(msg) | FailureCause::Panicked(msg) => warn!(
                    parent: self.telemetry.span(),
                    op,
                    scenario = %id,
                    cause = %msg,
                    "strategy failed"
                ),
            }
        }
        let removed: Vec<ScenarioId> = failures
            .iter()
            .map(|(id, _)| *id)
            .filter(|&id| self.pool.contains(id))
            .collect();
        self.pool.remove(&removed);
        if !removed.is_empty() {
            debug!(
                parent: self.telemetry.span(),
                op,
                removed = removed.len(),
                size = self.pool.size(),
                "scenarios removed"
            );
        }
        SweepReport { removed, failures }
    }
}

impl std::fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentManager")
            .field("components", &self.components)
            .field("pool_size", &self.pool.size())
            .field("time", &self.world.time())
            .finish()
    }
}

/// Runs a strategy call, turning errors and panics into a failure cause.
fn guarded<T>(f: impl FnOnce() -> Result<T, StrategyError>) -> Result<T, FailureCause> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(FailureCause::Strategy(e.to_string())),
        Err(payload) => Err(FailureCause::Panicked(panic_message(payload.as_ref()))),
    }
}

fn failure(id: ScenarioId, outcome: Result<bool, FailureCause>) -> Option<(ScenarioId, FailureCause)> {
    match outcome {
        Ok(true) => None,
        Ok(false) => Some((id, FailureCause::Rejected)),
        Err(cause) => Some((id, cause)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
