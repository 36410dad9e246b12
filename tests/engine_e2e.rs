//! End-to-end behaviour of the orchestrator and the event loop.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use msa_routing::components::Components;
use msa_routing::config::EngineConfig;
use msa_routing::engine::Engine;
use msa_routing::error::EngineError;
use msa_routing::events::EngineEvent;
use msa_routing::manager::{Budget, ComponentManager};
use msa_routing::models::{Instance, Node, NodeId, Resource, TimeWindow};
use msa_routing::monitor::Telemetry;
use msa_routing::world::{Commitment, RequestStatus};

const COMMITTED: NodeId = 3;

/// Two resources and ten requests; request 3 must be reached before `due`.
fn instance(due: f64) -> Arc<Instance> {
    let mut builder = Instance::builder()
        .resource(Resource::new(0, 100))
        .resource(Resource::new(1, 100).with_home(30.0, 30.0));
    for i in 0..10 {
        let x = (i % 5) as f64 * 6.0;
        let y = (i / 5) as f64 * 12.0;
        let mut node = Node::request(i, x, y, 2.0);
        if i == COMMITTED {
            node = node.with_time_window(TimeWindow::new(0.0, due).expect("valid"));
        }
        builder = builder.request(node);
    }
    Arc::new(builder.build().expect("valid"))
}

fn config() -> EngineConfig {
    EngineConfig::default()
        .with_pool_size(5)
        .with_max_threads(2)
        .with_seed(42)
        .with_gen_max_scenario_time(Duration::from_millis(200))
        .with_opt_max_scenario_time(Duration::from_millis(20))
}

/// A manager whose pool holds five scenarios over the ten released requests.
fn manager(due: f64) -> ComponentManager {
    let mut m = ComponentManager::new(
        instance(due),
        config(),
        Components::reference(),
        Telemetry::new("e2e"),
    )
    .expect("valid");
    let all: Vec<NodeId> = (0..10).collect();
    let report = m.insert_requests(&all).expect("valid");
    assert_eq!(report.accepted.len(), 10);
    let budget = Budget::time(Duration::from_secs(10)).with_iterations(50);
    m.generate_scenarios(budget, &AtomicBool::new(false));
    assert_eq!(m.pool().size(), 5);
    m
}

#[test]
fn test_commitment_is_frozen_in_every_survivor() {
    let mut m = manager(200.0);
    let start = m.world().instance().resources()[0].start_node();
    let before: Vec<_> = m.pool().snapshot().iter().map(|s| s.id()).collect();

    let report = m
        .enforce_decision(Commitment::new(0, COMMITTED, 50.0))
        .expect("valid");

    // request 3 is reachable by its due time, so every scenario can follow
    assert!(!m.pool().is_empty());
    for member in m.pool().snapshot() {
        let s = member.lock();
        assert!(before.contains(&s.id()));
        assert!(s.plan().is_frozen(COMMITTED));
        assert_eq!(s.plan().tour_of(COMMITTED), Some(0));
        assert_eq!(s.plan().pred(COMMITTED), Some(start));
        assert!(s.plan().arrival(COMMITTED).expect("planned") >= 50.0);
        assert!(s.is_feasible());
    }

    // removed scenarios stay out of the pool
    for id in &report.removed {
        assert!(!m.pool().contains(*id));
    }
    assert_eq!(
        m.world().status(COMMITTED),
        Some(RequestStatus::Assigned { resource: 0 })
    );
}

#[test]
fn test_unreachable_commitment_exhausts_pool() {
    // due at 40, committed no earlier than 50: no scenario can serve it in time
    let mut m = manager(40.0);
    let err = m
        .enforce_decision(Commitment::new(0, COMMITTED, 50.0))
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::PoolExhausted {
            resource: 0,
            node: COMMITTED
        }
    );
    assert!(m.pool().is_empty());

    // the pool regenerates from the world, with the late visit frozen
    let budget = Budget::time(Duration::from_secs(10)).with_iterations(50);
    m.generate_scenarios(budget, &AtomicBool::new(false));
    assert_eq!(m.pool().size(), 5);
    for member in m.pool().snapshot() {
        let s = member.lock();
        assert!(s.plan().is_frozen(COMMITTED));
        assert!(s.is_feasible_ahead());
    }
    assert!(!m.build_distinguished_plan().is_none());
}

#[test]
fn test_zero_budget_leaves_pool_unchanged() {
    let mut m = manager(200.0);
    let before: Vec<_> = m.pool().snapshot().iter().map(|s| s.id()).collect();
    assert_eq!(m.generate_scenarios(Budget::zero(), &AtomicBool::new(false)), 0);

    let mut empty = ComponentManager::new(
        instance(200.0),
        config(),
        Components::reference(),
        Telemetry::default(),
    )
    .expect("valid");
    assert_eq!(empty.generate_scenarios(Budget::zero(), &AtomicBool::new(false)), 0);
    assert!(empty.pool().is_empty());

    let after: Vec<_> = m.pool().snapshot().iter().map(|s| s.id()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_empty_pool_has_no_solution() {
    let m = ComponentManager::new(
        instance(200.0),
        config(),
        Components::reference(),
        Telemetry::default(),
    )
    .expect("valid");
    let solution = m.build_distinguished_plan();
    assert!(solution.is_none());
    assert_eq!(solution.cost(), None);
    assert!(solution.actions().is_empty());
}

#[test]
fn test_event_loop_day() {
    let mut engine = Engine::new(instance(200.0), config(), Components::reference()).expect("valid");
    engine.initialize();
    let sender = engine.sender();

    sender.send(EngineEvent::ResourceStart {
        resource: 0,
        time: 0.0,
    });
    sender.send(EngineEvent::NewRequest {
        nodes: (0..10).collect(),
        time: 1.0,
    });
    sender.send(EngineEvent::Commit(Commitment::new(0, COMMITTED, 50.0)));
    // real-world events are dispatched in the order they were sent
    assert!(matches!(engine.step().expect("valid"), EngineEvent::ResourceStart { .. }));
    assert!(engine.snapshot().resources[0].active);
    assert!(matches!(engine.step().expect("valid"), EngineEvent::NewRequest { .. }));
    assert!(matches!(engine.step().expect("valid"), EngineEvent::Commit(_)));
    for member in engine.manager().pool().snapshot() {
        assert!(member.lock().plan().is_frozen(COMMITTED));
    }

    let arrival = engine.manager().world().committed(0)[1].arrival;
    sender.send(EngineEvent::StartOfService {
        resource: 0,
        node: COMMITTED,
        time: arrival,
    });
    sender.send(EngineEvent::EndOfService {
        resource: 0,
        node: COMMITTED,
        time: arrival + 2.0,
    });
    assert!(matches!(engine.step().expect("valid"), EngineEvent::StartOfService { .. }));
    assert_eq!(
        engine.manager().world().status(COMMITTED),
        Some(RequestStatus::InService { resource: 0 })
    );
    assert!(matches!(engine.step().expect("valid"), EngineEvent::EndOfService { .. }));

    while !matches!(engine.step().expect("valid"), EngineEvent::Decide { .. }) {}
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.resources[0].served, vec![COMMITTED]);
    assert!((snapshot.time - (arrival + 2.0)).abs() < 1e-10);
    assert!(snapshot.pool_size > 0);
    assert!(snapshot.solution_cost.is_some());
}
