//! Scenario: one complete speculative plan over all resources.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::models::{Instance, NodeId};

use super::{GiantTour, PlanError};

static NEXT_SCENARIO_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a scenario. Clones receive a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioId(u64);

impl ScenarioId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SCENARIO_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// A complete candidate plan: one tour per resource plus the requests the
/// plan knows about but does not visit.
///
/// Requests are either *actual* (released in reality) or *sampled*
/// (hypothetical future requests drawn by a sampler). Every request the
/// scenario knows and does not visit is *unassigned* and costs
/// `unserved_penalty`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use msa_routing::models::{Instance, Node, Resource};
/// use msa_routing::plan::Scenario;
///
/// let instance = Arc::new(
///     Instance::builder()
///         .resource(Resource::new(0, 10))
///         .request(Node::request(0, 3.0, 4.0, 0.0))
///         .build()
///         .unwrap(),
/// );
/// let mut scenario = Scenario::new(instance, 1000.0);
/// scenario.add_request(0).unwrap();
/// assert!((scenario.cost() - 1000.0).abs() < 1e-10);
///
/// let start = scenario.plan().tour(0).unwrap().start();
/// scenario.insert_after(start, 0).unwrap();
/// assert!((scenario.cost() - 10.0).abs() < 1e-10);
///
/// let copy = scenario.clone();
/// assert_ne!(copy.id(), scenario.id());
/// ```
#[derive(Debug)]
pub struct Scenario {
    id: ScenarioId,
    plan: GiantTour,
    unassigned: BTreeSet<NodeId>,
    sampled: BTreeSet<NodeId>,
    unserved_penalty: f64,
    age: u32,
    created_at: Instant,
}

impl Scenario {
    /// Creates a scenario with empty tours and freezing support.
    pub fn new(instance: Arc<Instance>, unserved_penalty: f64) -> Self {
        Self::from_plan(GiantTour::new(instance), unserved_penalty)
    }

    /// Creates a scenario for a static problem (freezing disabled).
    pub fn without_freezing(instance: Arc<Instance>, unserved_penalty: f64) -> Self {
        Self::from_plan(GiantTour::without_freezing(instance), unserved_penalty)
    }

    fn from_plan(plan: GiantTour, unserved_penalty: f64) -> Self {
        Self {
            id: ScenarioId::next(),
            plan,
            unassigned: BTreeSet::new(),
            sampled: BTreeSet::new(),
            unserved_penalty,
            age: 0,
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> ScenarioId {
        self.id
    }

    pub fn instance(&self) -> &Arc<Instance> {
        self.plan.instance()
    }

    /// Read access to the tours; mutations go through the scenario so the
    /// unassigned set stays consistent.
    pub fn plan(&self) -> &GiantTour {
        &self.plan
    }

    /// Number of consecutive non-improving optimization rounds.
    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn increment_age(&mut self) {
        self.age = self.age.saturating_add(1);
    }

    pub fn reset_age(&mut self) {
        self.age = 0;
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn unserved_penalty(&self) -> f64 {
        self.unserved_penalty
    }

    /// Travel and fixed cost of the tours plus the penalty for every
    /// unassigned request.
    pub fn cost(&self) -> f64 {
        self.plan.total_cost() + self.unserved_penalty * self.unassigned.len() as f64
    }

    pub fn is_feasible(&self) -> bool {
        self.plan.is_feasible()
    }

    /// Feasible apart from violations at frozen nodes.
    pub fn is_feasible_ahead(&self) -> bool {
        self.plan.is_feasible_ahead()
    }

    /// Known requests (actual or sampled) that no tour visits.
    pub fn unassigned(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.unassigned.iter().copied()
    }

    pub fn num_unassigned(&self) -> usize {
        self.unassigned.len()
    }

    pub fn is_unassigned(&self, node: NodeId) -> bool {
        self.unassigned.contains(&node)
    }

    /// Unassigned requests that are actual, not sampled.
    pub fn unassigned_actual(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.unassigned().filter(|n| !self.sampled.contains(n))
    }

    pub fn sampled(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.sampled.iter().copied()
    }

    pub fn is_sampled(&self, node: NodeId) -> bool {
        self.sampled.contains(&node)
    }

    /// Whether the scenario knows the request, planned or not.
    pub fn knows(&self, node: NodeId) -> bool {
        self.plan.contains(node) || self.unassigned.contains(&node)
    }

    /// Registers an actual request.
    ///
    /// A request the scenario already sampled becomes actual in place and
    /// keeps its position; returns `true` in that case.
    pub fn add_request(&mut self, node: NodeId) -> Result<bool, PlanError> {
        self.check_request(node)?;
        let was_sampled = self.sampled.remove(&node);
        if !self.plan.contains(node) {
            self.unassigned.insert(node);
        }
        Ok(was_sampled)
    }

    /// Registers a hypothetical request drawn by a sampler.
    pub fn add_sampled(&mut self, node: NodeId) -> Result<(), PlanError> {
        self.check_request(node)?;
        if self.knows(node) {
            return Err(PlanError::AlreadyPlanned(node));
        }
        self.sampled.insert(node);
        self.unassigned.insert(node);
        Ok(())
    }

    pub fn insert_after(&mut self, pred: NodeId, node: NodeId) -> Result<(), PlanError> {
        self.plan.insert_after(pred, node)?;
        self.unassigned.remove(&node);
        Ok(())
    }

    pub fn remove_node(&mut self, node: NodeId) -> Result<(), PlanError> {
        self.plan.remove_node(node)?;
        self.unassigned.insert(node);
        Ok(())
    }

    pub fn set_node(&mut self, old: NodeId, new: NodeId) -> Result<(), PlanError> {
        self.plan.set_node(old, new)?;
        self.unassigned.remove(&new);
        self.unassigned.insert(old);
        Ok(())
    }

    pub fn relocate_after(&mut self, pred: NodeId, node: NodeId) -> Result<(), PlanError> {
        self.plan.relocate_after(pred, node)
    }

    /// Removes every request after `node`; they become unassigned.
    pub fn truncate_after(&mut self, node: NodeId) -> Result<Vec<NodeId>, PlanError> {
        let removed = self.plan.truncate_after(node)?;
        self.unassigned.extend(removed.iter().copied());
        Ok(removed)
    }

    pub fn freeze(&mut self, node: NodeId, arrival: f64, departure: f64) -> Result<(), PlanError> {
        self.plan.freeze(node, arrival, departure)
    }

    pub fn reset_frozen(&mut self, resource: usize) {
        self.plan.reset_frozen(resource);
    }

    /// Cuts a tour back until it is feasible again.
    ///
    /// At each step the tour is truncated right before its first infeasible
    /// node (a late home return drops the last request instead). Fails when
    /// the infeasibility sits at a frozen node. Returns the displaced
    /// requests, which are now unassigned.
    pub fn repair_infeasible(&mut self, resource: usize) -> Result<Vec<NodeId>, PlanError> {
        let mut displaced = Vec::new();
        while let Some(n) = self.plan.first_infeasible(resource) {
            if self.plan.is_frozen(n) {
                return Err(PlanError::FrozenNodeViolation(n));
            }
            let pred = self.plan.pred(n).ok_or(PlanError::NotInTour(n))?;
            let cut = if self.instance().is_request(n) {
                pred
            } else {
                if self.plan.is_frozen(pred) {
                    return Err(PlanError::FrozenNodeViolation(pred));
                }
                self.plan.pred(pred).ok_or(PlanError::NotInTour(pred))?
            };
            displaced.extend(self.truncate_after(cut)?);
        }
        Ok(displaced)
    }

    /// Takes over the tours and request sets of `other`, keeping this
    /// scenario's identity, age and creation time.
    pub fn adopt(&mut self, other: Scenario) {
        self.plan = other.plan;
        self.unassigned = other.unassigned;
        self.sampled = other.sampled;
    }

    fn check_request(&self, node: NodeId) -> Result<(), PlanError> {
        match self.instance().node(node) {
            None => Err(PlanError::UnknownNode(node)),
            Some(n) if !n.is_request() => Err(PlanError::HomeNode(node)),
            Some(_) => Ok(()),
        }
    }
}

impl Clone for Scenario {
    fn clone(&self) -> Self {
        Self {
            id: ScenarioId::next(),
            plan: self.plan.clone(),
            unassigned: self.unassigned.clone(),
            sampled: self.sampled.clone(),
            unserved_penalty: self.unserved_penalty,
            age: self.age,
            created_at: Instant::now(),
        }
    }
}
