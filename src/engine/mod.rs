//! The decision/event loop.
//!
//! [`Engine`] pops one event at a time from its [`EventQueue`] and runs it to
//! completion through the [`ComponentManager`]. When nothing is queued the
//! queue hands out a background [`EngineEvent::Optimize`] tick, which polls
//! the queue's preemption flag so that real events are not held up by more
//! than one scenario-optimization step.
//!
//! ```text
//!   Idle ──pop──▶ Dispatching ──done──▶ Idle
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::components::{Components, DistinguishedSolution};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{EngineEvent, EventQueue, EventSender};
use crate::manager::{Budget, ComponentManager};
use crate::models::{Instance, NodeId};
use crate::monitor::Telemetry;

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Dispatching,
}

/// Read-only view of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub resource: usize,
    pub active: bool,
    /// Last committed node (the home start before any commitment).
    pub current: Option<NodeId>,
    pub in_service: Option<NodeId>,
    /// Committed but not yet served.
    pub assigned: Option<NodeId>,
    pub served: Vec<NodeId>,
}

/// Read-only view of the engine for monitors and host applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub time: f64,
    pub state: EngineState,
    pub pool_size: usize,
    pub pool_capacity: usize,
    pub resources: Vec<ResourceSnapshot>,
    /// Cost of the scenario behind the current distinguished solution.
    pub solution_cost: Option<f64>,
    pub best_cost: Option<f64>,
}

/// The decision/event loop around a [`ComponentManager`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use msa_routing::components::Components;
/// use msa_routing::config::EngineConfig;
/// use msa_routing::engine::Engine;
/// use msa_routing::events::EngineEvent;
/// use msa_routing::models::{Instance, Node, Resource};
///
/// let instance = Instance::builder()
///     .resource(Resource::new(0, 100))
///     .request(Node::request(0, 5.0, 0.0, 1.0))
///     .build()
///     .unwrap();
/// let config = EngineConfig::default()
///     .with_pool_size(2)
///     .with_max_threads(1)
///     .with_seed(3)
///     .with_opt_max_scenario_time(Duration::from_millis(5));
/// let mut engine = Engine::new(Arc::new(instance), config, Components::reference()).unwrap();
/// engine.initialize();
///
/// engine.sender().send(EngineEvent::NewRequest { nodes: vec![0], time: 1.0 });
/// assert!(matches!(engine.step().unwrap(), EngineEvent::NewRequest { .. }));
/// assert_eq!(engine.snapshot().time, 1.0);
/// ```
pub struct Engine {
    manager: ComponentManager,
    queue: EventQueue,
    state: EngineState,
    solution: DistinguishedSolution,
}

impl Engine {
    pub fn new(
        instance: Arc<Instance>,
        config: EngineConfig,
        components: Components,
    ) -> Result<Self, EngineError> {
        Self::with_telemetry(instance, config, components, Telemetry::default())
    }

    pub fn with_telemetry(
        instance: Arc<Instance>,
        config: EngineConfig,
        components: Components,
        telemetry: Telemetry,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            manager: ComponentManager::new(instance, config, components, telemetry)?,
            queue: EventQueue::new(),
            state: EngineState::Idle,
            solution: DistinguishedSolution::none(),
        })
    }

    pub fn manager(&self) -> &ComponentManager {
        &self.manager
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn sender(&self) -> EventSender {
        self.queue.sender()
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Last distinguished solution built by [`decide`](Self::decide).
    pub fn solution(&self) -> &DistinguishedSolution {
        &self.solution
    }

    /// Fills the pool to its initial share. Returns how many scenarios were
    /// generated; a background generation is queued if the pool is not full.
    pub fn initialize(&mut self) -> usize {
        let config = self.manager.config();
        let target = config.initial_pool_target();
        let budget = Budget::time(config.gen_max_scenario_time.mul_f64(target.max(1) as f64))
            .with_iterations(4 * target.max(1));
        let preempt = self.queue.preempt_flag();
        let added = self.manager.generate_up_to(target, budget, &preempt);
        if !self.manager.pool().is_full() {
            self.queue.push(EngineEvent::Generate);
        }
        self.decide();
        info!(
            parent: self.manager.telemetry().span(),
            added,
            target,
            "pool initialized"
        );
        added
    }

    /// Rebuilds the distinguished solution from the current pool.
    pub fn decide(&mut self) -> &DistinguishedSolution {
        self.solution = self.manager.build_distinguished_plan();
        debug!(
            parent: self.manager.telemetry().span(),
            cost = ?self.solution.cost(),
            actions = ?self.solution.actions(),
            "distinguished solution built"
        );
        &self.solution
    }

    /// Dispatches exactly one event (a background tick when the queue is
    /// empty) and returns it.
    ///
    /// Per-scenario failures never surface here; only pool exhaustion and
    /// malformed input do.
    pub fn step(&mut self) -> Result<EngineEvent, EngineError> {
        let event = self.queue.pop();
        self.state = EngineState::Dispatching;
        let result = self.dispatch(&event);
        self.state = EngineState::Idle;
        result.map(|()| event)
    }

    /// Steps until `stop` is set. Recoverable errors are logged and the loop
    /// goes on; others end it.
    ///
    /// `stop` is checked between steps.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), EngineError> {
        while !stop.load(Ordering::Acquire) {
            match self.step() {
                Ok(_) => {}
                Err(e) if e.is_recoverable() => warn!(
                    parent: self.manager.telemetry().span(),
                    code = e.code(),
                    "{e}"
                ),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let world = self.manager.world();
        let resources = world
            .resources()
            .iter()
            .enumerate()
            .map(|(resource, state)| ResourceSnapshot {
                resource,
                active: state.is_active(),
                current: state.last_visit().map(|v| v.node),
                in_service: state.in_service(),
                assigned: state.assigned(),
                served: state.served().to_vec(),
            })
            .collect();
        EngineSnapshot {
            time: world.time(),
            state: self.state,
            pool_size: self.manager.pool().size(),
            pool_capacity: self.manager.pool().capacity(),
            resources,
            solution_cost: self.solution.cost(),
            best_cost: self.manager.pool().best().map(|s| s.cost()),
        }
    }

    fn dispatch(&mut self, event: &EngineEvent) -> Result<(), EngineError> {
        debug!(parent: self.manager.telemetry().span(), ?event, "dispatching");
        match event {
            EngineEvent::NewRequest { nodes, time } => {
                self.manager.advance_time(*time);
                let report = self.manager.insert_requests(nodes)?;
                if !report.sweep.removed.is_empty() {
                    self.queue.push(EngineEvent::Generate);
                }
            }
            EngineEvent::Commit(commitment) => {
                let result = self.manager.enforce_decision(*commitment);
                if !self.manager.pool().is_full() {
                    self.queue.push(EngineEvent::Generate);
                }
                result?;
            }
            EngineEvent::ResourceStart { resource, time } => {
                self.manager.advance_time(*time);
                self.manager.start_service(*resource)?;
            }
            EngineEvent::ResourceStop { resource, time } => {
                self.manager.advance_time(*time);
                self.manager.stop_service(*resource)?;
            }
            EngineEvent::StartOfService {
                resource,
                node,
                time,
            } => {
                self.manager.start_of_service(*resource, *node, *time)?;
            }
            EngineEvent::EndOfService {
                resource,
                node,
                time,
            } => {
                self.manager.end_of_service(*resource, *node, *time)?;
                self.queue.push(EngineEvent::Decide { time: *time });
            }
            EngineEvent::Decide { time } => {
                self.manager.advance_time(*time);
                self.decide();
            }
            EngineEvent::Generate => self.generate_batch(),
            EngineEvent::Optimize => {
                if !self.manager.pool().is_full() {
                    self.generate_batch();
                }
                let budget = Budget::time(self.manager.config().optimize_budget());
                let preempt = self.queue.preempt_flag();
                self.manager.optimize_pool(budget, &preempt);
            }
            EngineEvent::CleanPool => {
                self.manager.clean_pool();
                if !self.manager.pool().is_full() {
                    self.queue.push(EngineEvent::Generate);
                }
            }
        }
        Ok(())
    }

    /// One background generation tick.
    fn generate_batch(&mut self) {
        let config = self.manager.config();
        let batch = config.generation_batch();
        let budget = Budget::time(config.gen_max_scenario_time.mul_f64(batch as f64))
            .with_iterations(4 * batch);
        let target = self.manager.pool().size() + batch;
        let preempt = self.queue.preempt_flag();
        self.manager.generate_up_to(target, budget, &preempt);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("manager", &self.manager)
            .field("queued", &self.queue.len())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::components::NextAction;
    use crate::models::{Node, Resource};
    use crate::monitor::MonitorKind;
    use crate::world::{Commitment, RequestStatus};

    fn engine() -> Engine {
        let instance = Instance::builder()
            .resource(Resource::new(0, 100))
            .resource(Resource::new(1, 100).with_home(10.0, 0.0))
            .request(Node::request(0, 2.0, 0.0, 1.0))
            .request(Node::request(1, 4.0, 0.0, 1.0))
            .request(Node::request(2, 8.0, 0.0, 1.0))
            .request(Node::request(3, 6.0, 3.0, 1.0).with_release_time(20.0))
            .build()
            .expect("valid");
        let config = EngineConfig::default()
            .with_pool_size(4)
            .with_pool_initial_proportion(0.5)
            .with_max_threads(2)
            .with_seed(5)
            .with_gen_max_scenario_time(Duration::from_millis(200))
            .with_opt_max_scenario_time(Duration::from_millis(10));
        Engine::new(Arc::new(instance), config, Components::reference()).expect("valid")
    }

    #[test]
    fn test_initialize_fills_initial_share() {
        let mut e = engine();
        assert_eq!(e.initialize(), 2);
        assert_eq!(e.manager().pool().size(), 2);
        assert_eq!(e.queue().len(), 1);
        assert!(!e.solution().is_none());
        assert_eq!(e.state(), EngineState::Idle);
    }

    #[test]
    fn test_empty_queue_optimizes_and_refills() {
        let mut e = engine();
        e.initialize();
        assert_eq!(e.step().expect("valid"), EngineEvent::Generate);
        // one batch is a fifth of the pool
        assert_eq!(e.manager().pool().size(), 3);
        assert_eq!(e.step().expect("valid"), EngineEvent::Optimize);
        assert!(e.manager().pool().is_full());
    }

    #[test]
    fn test_request_commit_and_service_cycle() {
        let mut e = engine();
        e.initialize();
        let mut events = e.manager().telemetry().subscribe();
        let sender = e.sender();

        sender.send(EngineEvent::Generate);
        sender.send(EngineEvent::NewRequest {
            nodes: vec![0, 1, 2],
            time: 1.0,
        });
        // the real event is dispatched before the queued background work
        assert!(matches!(e.step().expect("valid"), EngineEvent::NewRequest { .. }));
        assert_eq!(e.manager().world().status(1), Some(RequestStatus::Released));

        sender.send(EngineEvent::Commit(Commitment::new(0, 0, 1.0)));
        assert!(matches!(e.step().expect("valid"), EngineEvent::Commit(_)));
        for member in e.manager().pool().snapshot() {
            assert!(member.lock().plan().is_frozen(0));
        }

        let arrival = e.manager().world().committed(0)[1].arrival;
        sender.send(EngineEvent::EndOfService {
            resource: 0,
            node: 0,
            time: arrival + 1.0,
        });
        assert!(matches!(e.step().expect("valid"), EngineEvent::EndOfService { .. }));
        // end of service schedules a decision; the earlier background
        // generation ticks are still queued behind it
        while !matches!(e.step().expect("valid"), EngineEvent::Decide { .. }) {}
        assert!(!matches!(e.solution().action(0), Some(NextAction::Visit(0))));

        let snapshot = e.snapshot();
        assert_eq!(snapshot.resources[0].served, vec![0]);
        assert_eq!(snapshot.resources[0].current, Some(0));
        assert_eq!(snapshot.resources[0].assigned, None);

        let kinds: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        for kind in [
            MonitorKind::NewRequest,
            MonitorKind::RequestReleased,
            MonitorKind::NodeAssigned,
            MonitorKind::NodeServed,
            MonitorKind::TimeChanged,
        ] {
            assert!(kinds.contains(&kind), "{kind:?}");
        }
    }

    #[test]
    fn test_dependent_events_dispatch_in_sending_order() {
        let mut e = engine();
        e.initialize();
        let sender = e.sender();
        sender.send(EngineEvent::NewRequest {
            nodes: vec![0, 1, 2],
            time: 1.0,
        });
        sender.send(EngineEvent::Commit(Commitment::new(0, 0, 1.0)));
        assert!(matches!(e.step().expect("valid"), EngineEvent::NewRequest { .. }));
        assert!(matches!(e.step().expect("valid"), EngineEvent::Commit(_)));
        assert_eq!(
            e.manager().world().status(0),
            Some(RequestStatus::Assigned { resource: 0 })
        );

        let arrival = e.manager().world().committed(0)[1].arrival;
        sender.send(EngineEvent::StartOfService {
            resource: 0,
            node: 0,
            time: arrival,
        });
        sender.send(EngineEvent::EndOfService {
            resource: 0,
            node: 0,
            time: arrival + 1.0,
        });
        assert!(matches!(e.step().expect("valid"), EngineEvent::StartOfService { .. }));
        assert_eq!(
            e.manager().world().status(0),
            Some(RequestStatus::InService { resource: 0 })
        );
        assert!(matches!(e.step().expect("valid"), EngineEvent::EndOfService { .. }));
        assert_eq!(
            e.manager().world().status(0),
            Some(RequestStatus::Served { resource: 0 })
        );
    }

    #[test]
    fn test_malformed_commitment_surfaces() {
        let mut e = engine();
        e.initialize();
        e.sender().send(EngineEvent::Commit(Commitment::new(0, 3, 0.0)));
        let err = e.step().unwrap_err();
        assert!(matches!(err, EngineError::MalformedCommitment(_)));
        assert_eq!(e.state(), EngineState::Idle);
    }

    #[test]
    fn test_run_stops() {
        let mut e = engine();
        let stop = AtomicBool::new(true);
        assert!(e.run(&stop).is_ok());
        assert!(e.manager().pool().is_empty());
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let mut e = engine();
        e.initialize();
        let snapshot = e.snapshot();
        assert_eq!(snapshot.pool_capacity, 4);
        assert_eq!(snapshot.resources.len(), 2);
        assert!(snapshot.best_cost.is_some());
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let back: EngineSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, snapshot);
    }
}
