//! A pooled scenario behind an advisory exclusive lock.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::models::NodeId;
use crate::plan::{Scenario, ScenarioId};

/// Cheap view of a scenario, refreshed each time its lock is released.
///
/// Eviction and pool-wide queries read summaries instead of locking every
/// scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    id: ScenarioId,
    cost: f64,
    age: u32,
    next: Vec<Option<NodeId>>,
}

impl ScenarioSummary {
    pub fn of(scenario: &Scenario) -> Self {
        let plan = scenario.plan();
        let next = plan
            .tours()
            .iter()
            .map(|t| {
                plan.succ(t.frontier())
                    .filter(|&n| scenario.instance().is_request(n))
            })
            .collect();
        Self {
            id: scenario.id(),
            cost: scenario.cost(),
            age: scenario.age(),
            next,
        }
    }

    pub fn id(&self) -> ScenarioId {
        self.id
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    /// Next planned request after each resource's frontier.
    pub fn next_visits(&self) -> &[Option<NodeId>] {
        &self.next
    }
}

/// A scenario shared between the pool and concurrent workers.
///
/// Locking gives exclusive read-modify-write access; the lock is released
/// when the guard is dropped.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use msa_routing::models::{Instance, Resource};
/// use msa_routing::plan::Scenario;
/// use msa_routing::pool::SharedScenario;
///
/// let instance = Arc::new(Instance::builder().resource(Resource::new(0, 1)).build().unwrap());
/// let shared = SharedScenario::new(Scenario::new(instance, 100.0));
///
/// let guard = shared.lock();
/// assert!(shared.try_lock_for(Duration::from_millis(1)).is_none());
/// drop(guard);
/// assert!(shared.try_lock_for(Duration::from_millis(1)).is_some());
/// ```
#[derive(Debug)]
pub struct SharedScenario {
    id: ScenarioId,
    scenario: Mutex<Scenario>,
    summary: RwLock<ScenarioSummary>,
    retired: AtomicBool,
}

impl SharedScenario {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            id: scenario.id(),
            summary: RwLock::new(ScenarioSummary::of(&scenario)),
            scenario: Mutex::new(scenario),
            retired: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ScenarioId {
        self.id
    }

    /// Blocks until the scenario is available.
    pub fn lock(&self) -> ScenarioGuard<'_> {
        ScenarioGuard {
            owner: self,
            guard: self.scenario.lock(),
        }
    }

    /// Gives up after `timeout`.
    pub fn try_lock_for(&self, timeout: Duration) -> Option<ScenarioGuard<'_>> {
        self.scenario
            .try_lock_for(timeout)
            .map(|guard| ScenarioGuard { owner: self, guard })
    }

    /// Summary as of the last released lock.
    pub fn summary(&self) -> ScenarioSummary {
        self.summary.read().clone()
    }

    pub fn cost(&self) -> f64 {
        self.summary.read().cost
    }

    pub fn age(&self) -> u32 {
        self.summary.read().age
    }

    /// Set once the scenario left a pool; it is never admitted again.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub fn into_inner(self) -> Scenario {
        self.scenario.into_inner()
    }
}

/// Exclusive access to a [`SharedScenario`].
pub struct ScenarioGuard<'a> {
    owner: &'a SharedScenario,
    guard: MutexGuard<'a, Scenario>,
}

impl Deref for ScenarioGuard<'_> {
    type Target = Scenario;

    fn deref(&self) -> &Scenario {
        &self.guard
    }
}

impl DerefMut for ScenarioGuard<'_> {
    fn deref_mut(&mut self) -> &mut Scenario {
        &mut self.guard
    }
}

impl Drop for ScenarioGuard<'_> {
    fn drop(&mut self) {
        *self.owner.summary.write() = ScenarioSummary::of(&self.guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::models::{Instance, Node, Resource};

    fn scenario() -> Scenario {
        let instance = Instance::builder()
            .resource(Resource::new(0, 10))
            .request(Node::request(0, 3.0, 4.0, 0.0))
            .build()
            .expect("valid");
        Scenario::new(Arc::new(instance), 100.0)
    }

    #[test]
    fn test_summary_refreshes_on_release() {
        let shared = SharedScenario::new(scenario());
        assert_eq!(shared.cost(), 0.0);
        {
            let mut s = shared.lock();
            s.add_request(0).expect("valid");
            let start = s.plan().tour(0).expect("tour").start();
            s.insert_after(start, 0).expect("valid");
            s.increment_age();
        }
        let summary = shared.summary();
        assert!((summary.cost() - 10.0).abs() < 1e-10);
        assert_eq!(summary.age(), 1);
        assert_eq!(summary.next_visits(), &[Some(0)]);
        assert_eq!(summary.id(), shared.id());
    }

    #[test]
    fn test_next_visit_skips_home() {
        let s = scenario();
        assert_eq!(ScenarioSummary::of(&s).next_visits(), &[None]);
    }

    #[test]
    fn test_try_lock_times_out() {
        let shared = SharedScenario::new(scenario());
        let _held = shared.lock();
        std::thread::scope(|scope| {
            let handle = scope.spawn(|| shared.try_lock_for(Duration::from_millis(5)).is_none());
            assert!(handle.join().expect("thread"));
        });
    }
}
