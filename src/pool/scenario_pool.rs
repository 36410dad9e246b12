//! Bounded, thread-safe scenario pool.

use std::sync::Arc;

use parking_lot::RwLock;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::plan::{Scenario, ScenarioId};

use super::{EvictionPolicy, SharedScenario, WorstCost};

/// A bounded collection of scenarios.
///
/// Membership changes happen under one write lock; readers take a snapshot
/// of the member list (copy-on-iterate), so an ongoing iteration never sees
/// a half-applied change. A removed scenario can never be admitted again.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use msa_routing::models::{Instance, Resource};
/// use msa_routing::plan::Scenario;
/// use msa_routing::pool::ScenarioPool;
///
/// let instance = Arc::new(Instance::builder().resource(Resource::new(0, 1)).build().unwrap());
/// let pool = ScenarioPool::new(2);
/// assert!(pool.add(Scenario::new(instance.clone(), 10.0)));
/// assert!(pool.add(Scenario::new(instance.clone(), 10.0)));
/// assert!(pool.is_full());
/// assert_eq!(pool.size(), pool.snapshot().len());
/// ```
pub struct ScenarioPool {
    capacity: usize,
    members: RwLock<Vec<Arc<SharedScenario>>>,
    eviction: Box<dyn EvictionPolicy>,
}

impl ScenarioPool {
    /// Creates a pool evicting the most expensive scenario when full.
    pub fn new(capacity: usize) -> Self {
        Self::with_eviction(capacity, Box::new(WorstCost))
    }

    pub fn with_eviction(capacity: usize, eviction: Box<dyn EvictionPolicy>) -> Self {
        Self {
            capacity,
            members: RwLock::new(Vec::with_capacity(capacity)),
            eviction,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.size() >= self.capacity
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.size())
    }

    pub fn eviction_policy(&self) -> &str {
        self.eviction.name()
    }

    pub fn contains(&self, id: ScenarioId) -> bool {
        self.members.read().iter().any(|m| m.id() == id)
    }

    /// Admits a scenario. See [`add_shared`](Self::add_shared).
    pub fn add(&self, scenario: Scenario) -> bool {
        self.add_shared(Arc::new(SharedScenario::new(scenario)))
    }

    /// Admits a shared scenario.
    ///
    /// Rejected when the same instance (or id) is already a member, when it
    /// was removed or evicted before, or when the pool is full and the
    /// eviction policy declines to free a slot.
    pub fn add_shared(&self, scenario: Arc<SharedScenario>) -> bool {
        let mut members = self.members.write();
        if scenario.is_retired() {
            return false;
        }
        if members
            .iter()
            .any(|m| Arc::ptr_eq(m, &scenario) || m.id() == scenario.id())
        {
            return false;
        }
        if members.len() < self.capacity {
            members.push(scenario);
            return true;
        }
        let summaries: Vec<_> = members.iter().map(|m| m.summary()).collect();
        let Some(victim) = self
            .eviction
            .select_victim(&scenario.summary(), &summaries)
            .filter(|&i| i < members.len())
        else {
            return false;
        };
        members.swap_remove(victim).retire();
        members.push(scenario);
        true
    }

    /// Removes scenarios by id in one atomic step; returns how many left.
    pub fn remove(&self, ids: &[ScenarioId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let mut members = self.members.write();
        let before = members.len();
        members.retain(|m| {
            let keep = !ids.contains(&m.id());
            if !keep {
                m.retire();
            }
            keep
        });
        before - members.len()
    }

    /// Copy of the current membership.
    pub fn snapshot(&self) -> Vec<Arc<SharedScenario>> {
        self.members.read().clone()
    }

    /// Uniformly sampled subset of at most `k` members.
    pub fn sample<R: Rng>(&self, k: usize, rng: &mut R) -> Vec<Arc<SharedScenario>> {
        let members = self.members.read();
        members.choose_multiple(rng, k).cloned().collect()
    }

    /// Minimum-cost member.
    pub fn best(&self) -> Option<Arc<SharedScenario>> {
        self.members
            .read()
            .iter()
            .min_by(|a, b| a.cost().total_cmp(&b.cost()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Instance, Node, Resource};
    use crate::pool::RejectWhenFull;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn instance() -> Arc<Instance> {
        Arc::new(
            Instance::builder()
                .resource(Resource::new(0, 10))
                .request(Node::request(0, 1.0, 0.0, 0.0))
                .request(Node::request(1, 2.0, 0.0, 0.0))
                .build()
                .expect("valid"),
        )
    }

    fn scenario_with_cost(unassigned: usize) -> Scenario {
        let mut s = Scenario::new(instance(), 10.0);
        for n in 0..unassigned {
            s.add_request(n).expect("valid");
        }
        s
    }

    #[test]
    fn test_add_until_full_then_evict() {
        let pool = ScenarioPool::new(2);
        assert!(pool.add(scenario_with_cost(2)));
        assert!(pool.add(scenario_with_cost(1)));
        assert_eq!(pool.remaining_capacity(), 0);
        // cheaper than the worst: replaces it
        assert!(pool.add(scenario_with_cost(0)));
        assert_eq!(pool.size(), 2);
        let best = pool.best().expect("non-empty");
        assert_eq!(best.cost(), 0.0);
        // not cheaper than the worst: rejected
        assert!(!pool.add(scenario_with_cost(2)));
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn test_reject_when_full_policy() {
        let pool = ScenarioPool::with_eviction(1, Box::new(RejectWhenFull));
        assert!(pool.add(scenario_with_cost(2)));
        assert!(!pool.add(scenario_with_cost(0)));
        assert_eq!(pool.eviction_policy(), "reject_when_full");
    }

    #[test]
    fn test_duplicates_rejected() {
        let pool = ScenarioPool::new(5);
        let shared = Arc::new(SharedScenario::new(scenario_with_cost(0)));
        assert!(pool.add_shared(shared.clone()));
        assert!(!pool.add_shared(shared.clone()));
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_removed_never_readmitted() {
        let pool = ScenarioPool::new(5);
        let shared = Arc::new(SharedScenario::new(scenario_with_cost(0)));
        let id = shared.id();
        pool.add_shared(shared.clone());
        assert_eq!(pool.remove(&[id]), 1);
        assert!(!pool.contains(id));
        assert!(shared.is_retired());
        assert!(!pool.add_shared(shared));
        assert_eq!(pool.remove(&[id]), 0);
    }

    #[test]
    fn test_evicted_never_readmitted() {
        let pool = ScenarioPool::new(1);
        let worst = Arc::new(SharedScenario::new(scenario_with_cost(2)));
        assert!(pool.add_shared(worst.clone()));
        assert!(pool.add(scenario_with_cost(0)));
        assert!(worst.is_retired());
        assert!(!pool.add_shared(worst));
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_concurrent_remove_and_readd_never_readmits() {
        let pool = ScenarioPool::new(4);
        let shared = Arc::new(SharedScenario::new(scenario_with_cost(0)));
        assert!(pool.add_shared(shared.clone()));
        std::thread::scope(|scope| {
            scope.spawn(|| pool.remove(&[shared.id()]));
            for _ in 0..100 {
                pool.add_shared(shared.clone());
            }
        });
        assert!(shared.is_retired());
        assert!(!pool.contains(shared.id()));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_batch_remove() {
        let pool = ScenarioPool::new(5);
        for _ in 0..4 {
            pool.add(scenario_with_cost(0));
        }
        let ids: Vec<_> = pool.snapshot().iter().take(3).map(|s| s.id()).collect();
        assert_eq!(pool.remove(&ids), 3);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_sample() {
        let pool = ScenarioPool::new(10);
        for _ in 0..6 {
            pool.add(scenario_with_cost(0));
        }
        let mut rng = StdRng::seed_from_u64(42);
        let sample = pool.sample(4, &mut rng);
        assert_eq!(sample.len(), 4);
        let mut ids: Vec<_> = sample.iter().map(|s| s.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_eq!(pool.sample(20, &mut rng).len(), 6);
    }

    #[test]
    fn test_best_on_empty_pool() {
        let pool = ScenarioPool::new(3);
        assert!(pool.best().is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_concurrent_add_remove_never_exceeds_capacity() {
        let pool = ScenarioPool::with_eviction(8, Box::new(RejectWhenFull));
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for i in 0..50 {
                        pool.add(scenario_with_cost(0));
                        if i % 3 == 0 {
                            let snap = pool.snapshot();
                            if let Some(first) = snap.first() {
                                pool.remove(&[first.id()]);
                            }
                        }
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..200 {
                    let snap = pool.snapshot();
                    assert!(snap.len() <= 8);
                    assert!(pool.size() <= 8);
                }
            });
        });
        assert!(pool.size() <= 8);
        assert_eq!(pool.size(), pool.snapshot().len());
    }
}
