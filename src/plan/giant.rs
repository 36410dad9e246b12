//! Giant permutation: all tours of a plan over one node-indexed array.
//!
//! # Representation
//!
//! Every node of the [`Instance`] owns one slot holding its predecessor,
//! successor, tour membership, schedule and frozen flag. Relinking is O(1);
//! each successful mutation re-propagates times forward from the mutation
//! point and latest arrival times backward to the tour start.
//!
//! # Time propagation
//!
//! ```text
//! arrival(n)   = departure(pred(n)) + travel(pred(n), n)
//! start(n)     = max(arrival(n), ready(n))
//! departure(n) = start(n) + service(n)
//! ```
//!
//! Frozen nodes keep their recorded arrival and departure. The start node of
//! every tour is frozen at construction, so frozen nodes form a prefix.

use std::sync::Arc;

use crate::models::{Instance, Node, NodeId};

use super::tour::{Tour, TourIter};
use super::PlanError;

/// Tolerance for time and load comparisons.
pub const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
struct Slot {
    pred: Option<NodeId>,
    succ: Option<NodeId>,
    tour: Option<usize>,
    arrival: f64,
    departure: f64,
    latest_arrival: f64,
    load: i32,
    frozen: bool,
}

impl Slot {
    const EMPTY: Slot = Slot {
        pred: None,
        succ: None,
        tour: None,
        arrival: 0.0,
        departure: 0.0,
        latest_arrival: f64::INFINITY,
        load: 0,
        frozen: false,
    };
}

/// The tours of every resource, stored as one giant permutation.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use msa_routing::models::{Instance, Node, Resource};
/// use msa_routing::plan::{GiantTour, PlanError};
///
/// let instance = Arc::new(
///     Instance::builder()
///         .resource(Resource::new(0, 10))
///         .request(Node::request(0, 3.0, 4.0, 2.0))
///         .request(Node::request(1, 6.0, 8.0, 2.0))
///         .build()
///         .unwrap(),
/// );
/// let start = instance.resource(0).unwrap().start_node();
///
/// let mut plan = GiantTour::new(instance);
/// plan.insert_after(start, 0).unwrap();
/// plan.insert_after(0, 1).unwrap();
/// assert_eq!(plan.route(0), vec![0, 1]);
/// assert!((plan.arrival(1).unwrap() - 12.0).abs() < 1e-10);
///
/// plan.freeze(0, 5.0, 7.0).unwrap();
/// assert_eq!(plan.remove_node(0), Err(PlanError::FrozenNodeViolation(0)));
/// ```
#[derive(Debug, Clone)]
pub struct GiantTour {
    instance: Arc<Instance>,
    freezing: bool,
    tours: Vec<Tour>,
    slots: Vec<Slot>,
}

impl GiantTour {
    /// Creates empty tours (start linked to end) for every resource.
    pub fn new(instance: Arc<Instance>) -> Self {
        let mut slots = vec![Slot::EMPTY; instance.num_nodes()];
        let mut tours = Vec::with_capacity(instance.num_resources());
        for r in instance.resources() {
            let (start, end) = (r.start_node(), r.end_node());
            slots[start] = Slot {
                succ: Some(end),
                tour: Some(r.id()),
                arrival: r.available_from(),
                departure: r.available_from(),
                frozen: true,
                ..Slot::EMPTY
            };
            slots[end] = Slot {
                pred: Some(start),
                tour: Some(r.id()),
                ..Slot::EMPTY
            };
            tours.push(Tour::new(r.id(), start, end));
        }
        let mut plan = Self {
            instance,
            freezing: true,
            tours,
            slots,
        };
        for r in 0..plan.tours.len() {
            let end = plan.tours[r].end;
            plan.propagate(r, end);
        }
        plan
    }

    /// Creates a plan that rejects [`freeze`](Self::freeze) (static problems).
    pub fn without_freezing(instance: Arc<Instance>) -> Self {
        Self {
            freezing: false,
            ..Self::new(instance)
        }
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn supports_freezing(&self) -> bool {
        self.freezing
    }

    pub fn tours(&self) -> &[Tour] {
        &self.tours
    }

    pub fn tour(&self, resource: usize) -> Option<&Tour> {
        self.tours.get(resource)
    }

    /// Resource whose tour contains `node`.
    pub fn tour_of(&self, node: NodeId) -> Option<usize> {
        self.slots.get(node).and_then(|s| s.tour)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.tour_of(node).is_some()
    }

    pub fn pred(&self, node: NodeId) -> Option<NodeId> {
        self.slots.get(node).and_then(|s| s.pred)
    }

    pub fn succ(&self, node: NodeId) -> Option<NodeId> {
        self.slots.get(node).and_then(|s| s.succ)
    }

    /// Planned arrival time, `None` for unplanned nodes.
    pub fn arrival(&self, node: NodeId) -> Option<f64> {
        self.planned_slot(node).map(|s| s.arrival)
    }

    pub fn departure(&self, node: NodeId) -> Option<f64> {
        self.planned_slot(node).map(|s| s.departure)
    }

    /// Latest arrival keeping the rest of the tour on time.
    pub fn latest_arrival(&self, node: NodeId) -> Option<f64> {
        self.planned_slot(node).map(|s| s.latest_arrival)
    }

    /// Cumulative demand up to and including `node`.
    pub fn load_at(&self, node: NodeId) -> Option<i32> {
        self.planned_slot(node).map(|s| s.load)
    }

    pub fn is_frozen(&self, node: NodeId) -> bool {
        self.slots.get(node).is_some_and(|s| s.frozen)
    }

    /// All nodes of a tour, start and end included.
    pub fn iter(&self, resource: usize) -> TourIter<'_> {
        TourIter {
            plan: self,
            next: self.tours.get(resource).map(|t| t.start),
        }
    }

    /// Request nodes of a tour in visiting order.
    pub fn route(&self, resource: usize) -> Vec<NodeId> {
        self.iter(resource)
            .filter(|&n| self.instance.is_request(n))
            .collect()
    }

    /// Every request node currently planned in some tour.
    pub fn planned_requests(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.instance.request_ids().filter(|&n| self.contains(n))
    }

    /// Unfrozen request nodes, the ones optimizers may move.
    pub fn movable_requests(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.planned_requests().filter(|&n| !self.is_frozen(n))
    }

    /// Tour cost: travel distance times the resource's unit cost, plus the
    /// fixed cost when at least one request is visited.
    pub fn tour_cost(&self, resource: usize) -> f64 {
        match (self.tours.get(resource), self.instance.resource(resource)) {
            (Some(t), Some(r)) => {
                let fixed = if t.is_empty() { 0.0 } else { r.fixed_cost() };
                t.distance * r.cost_per_distance() + fixed
            }
            _ => 0.0,
        }
    }

    pub fn total_cost(&self) -> f64 {
        (0..self.tours.len()).map(|r| self.tour_cost(r)).sum()
    }

    pub fn total_distance(&self) -> f64 {
        self.tours.iter().map(|t| t.distance).sum()
    }

    /// First node of the tour that arrives after its due time or pushes the
    /// cumulative load over capacity.
    pub fn first_infeasible(&self, resource: usize) -> Option<NodeId> {
        let capacity = self.instance.resource(resource)?.capacity();
        self.iter(resource).find(|&n| self.violates(n, capacity))
    }

    pub fn is_feasible(&self) -> bool {
        (0..self.tours.len()).all(|r| self.first_infeasible(r).is_none())
    }

    /// Like [`is_feasible`](Self::is_feasible), but lateness or overload at a
    /// frozen node is accepted: it already happened.
    pub fn is_feasible_ahead(&self) -> bool {
        (0..self.tours.len()).all(|r| {
            let capacity = self.instance.resources()[r].capacity();
            self.iter(r)
                .all(|n| self.slots[n].frozen || !self.violates(n, capacity))
        })
    }

    fn violates(&self, node: NodeId, capacity: i32) -> bool {
        let slot = &self.slots[node];
        slot.arrival > self.instance.nodes()[node].due() + EPS || slot.load > capacity
    }

    /// Returns `true` if inserting `node` right after `pred` keeps the tour
    /// feasible. O(1) thanks to the latest arrival times.
    pub fn can_insert(&self, pred: NodeId, node: NodeId) -> bool {
        let Some(r) = self.tour_of(pred) else {
            return false;
        };
        let Some(succ) = self.succ(pred) else {
            return false;
        };
        if !self.instance.is_request(node) || self.contains(node) || self.slots[succ].frozen {
            return false;
        }
        if !self.instance.can_serve(r, node) {
            return false;
        }
        let n = &self.instance.nodes()[node];
        let capacity = self.instance.resources()[r].capacity();
        if self.tours[r].load + n.demand() > capacity {
            return false;
        }
        let arrival = self.slots[pred].departure + self.instance.travel_time(pred, node);
        if arrival > n.due() + EPS {
            return false;
        }
        let departure = n.earliest_start(arrival) + n.service_duration();
        let succ_arrival = departure + self.instance.travel_time(node, succ);
        succ_arrival <= self.slots[succ].latest_arrival + EPS
    }

    /// Cost increase of inserting `node` right after `pred`.
    pub fn insertion_cost(&self, pred: NodeId, node: NodeId) -> f64 {
        let (Some(r), Some(succ)) = (self.tour_of(pred), self.succ(pred)) else {
            return f64::INFINITY;
        };
        let inst = &self.instance;
        let delta = inst.distance(pred, node) + inst.distance(node, succ) - inst.distance(pred, succ);
        let resource = &inst.resources()[r];
        let fixed = if self.tours[r].is_empty() {
            resource.fixed_cost()
        } else {
            0.0
        };
        delta * resource.cost_per_distance() + fixed
    }

    /// Cost decrease of removing a planned `node`.
    pub fn removal_saving(&self, node: NodeId) -> f64 {
        let (Some(r), Some(pred), Some(succ)) = (self.tour_of(node), self.pred(node), self.succ(node))
        else {
            return 0.0;
        };
        let inst = &self.instance;
        let delta = inst.distance(pred, node) + inst.distance(node, succ) - inst.distance(pred, succ);
        let resource = &inst.resources()[r];
        let fixed = if self.tours[r].len == 1 {
            resource.fixed_cost()
        } else {
            0.0
        };
        delta * resource.cost_per_distance() + fixed
    }

    /// Inserts an unplanned request right after `pred`.
    ///
    /// `pred` may be the frontier (last frozen node) but the link after it
    /// must not lead to a frozen node.
    pub fn insert_after(&mut self, pred: NodeId, node: NodeId) -> Result<(), PlanError> {
        self.check_unplanned_request(node)?;
        let succ = self.open_link(pred)?;
        let r = self.slots[pred].tour.ok_or(PlanError::NotInTour(pred))?;
        self.link_between(r, pred, node, succ);
        self.propagate(r, node);
        Ok(())
    }

    /// Removes an unfrozen request from its tour.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), PlanError> {
        self.check_movable(node)?;
        let (r, succ) = self.unlink(node);
        self.propagate(r, succ);
        Ok(())
    }

    /// Replaces the unfrozen request `old` by the unplanned request `new`.
    pub fn set_node(&mut self, old: NodeId, new: NodeId) -> Result<(), PlanError> {
        self.check_movable(old)?;
        self.check_unplanned_request(new)?;
        let pred = self.slots[old].pred.ok_or(PlanError::NotInTour(old))?;
        let (r, succ) = self.unlink(old);
        self.link_between(r, pred, new, succ);
        self.propagate(r, new);
        Ok(())
    }

    /// Moves an unfrozen request right after `pred`, possibly across tours.
    pub fn relocate_after(&mut self, pred: NodeId, node: NodeId) -> Result<(), PlanError> {
        self.check_movable(node)?;
        if pred == node {
            return Err(PlanError::AlreadyPlanned(node));
        }
        let succ = self.open_link(pred)?;
        if succ == node {
            return Ok(());
        }
        let target = self.slots[pred].tour.ok_or(PlanError::NotInTour(pred))?;
        let (source, old_succ) = self.unlink(node);
        let succ = self.slots[pred].succ.ok_or(PlanError::NotInTour(pred))?;
        self.link_between(target, pred, node, succ);
        if source == target {
            let start = self.tours[target].start;
            self.propagate(target, start);
        } else {
            self.propagate(source, old_succ);
            self.propagate(target, node);
        }
        Ok(())
    }

    /// Removes every request between `node` and the end of its tour.
    ///
    /// Fails without change if any of them is frozen. Returns the removed
    /// requests in visiting order.
    pub fn truncate_after(&mut self, node: NodeId) -> Result<Vec<NodeId>, PlanError> {
        self.check_known(node)?;
        let r = self.slots[node].tour.ok_or(PlanError::NotInTour(node))?;
        let end = self.tours[r].end;
        let mut removed = Vec::new();
        let mut cur = self.slots[node].succ;
        while let Some(n) = cur {
            if n == end {
                break;
            }
            if self.slots[n].frozen {
                return Err(PlanError::FrozenNodeViolation(n));
            }
            removed.push(n);
            cur = self.slots[n].succ;
        }
        if removed.is_empty() {
            return Ok(removed);
        }
        for &n in &removed {
            self.slots[n] = Slot::EMPTY;
        }
        self.slots[node].succ = Some(end);
        self.slots[end].pred = Some(node);
        self.propagate(r, end);
        Ok(removed)
    }

    /// Freezes a planned node at the given schedule.
    ///
    /// The predecessor must already be frozen; freezing twice fails.
    pub fn freeze(&mut self, node: NodeId, arrival: f64, departure: f64) -> Result<(), PlanError> {
        if !self.freezing {
            return Err(PlanError::FreezingDisabled);
        }
        self.check_known(node)?;
        let slot = self.slots[node];
        let r = slot.tour.ok_or(PlanError::NotInTour(node))?;
        if slot.frozen {
            return Err(PlanError::AlreadyFrozen(node));
        }
        if !slot.pred.is_some_and(|p| self.slots[p].frozen) {
            return Err(PlanError::FreezeOutOfOrder(node));
        }
        let s = &mut self.slots[node];
        s.frozen = true;
        s.arrival = arrival;
        s.departure = departure.max(arrival);
        self.tours[r].frontier = node;
        self.propagate(r, node);
        Ok(())
    }

    /// Clears the frozen flags of one tour, keeping only the start anchor.
    pub fn reset_frozen(&mut self, resource: usize) {
        let Some(tour) = self.tours.get(resource) else {
            return;
        };
        let (start, end) = (tour.start, tour.end);
        let mut cur = self.slots[start].succ;
        while let Some(n) = cur {
            self.slots[n].frozen = false;
            cur = self.slots[n].succ;
        }
        self.tours[resource].frontier = start;
        let first = self.slots[start].succ.unwrap_or(end);
        self.propagate(resource, first);
    }

    fn planned_slot(&self, node: NodeId) -> Option<&Slot> {
        self.slots.get(node).filter(|s| s.tour.is_some())
    }

    fn check_known(&self, node: NodeId) -> Result<&Node, PlanError> {
        self.instance.node(node).ok_or(PlanError::UnknownNode(node))
    }

    fn check_unplanned_request(&self, node: NodeId) -> Result<(), PlanError> {
        if !self.check_known(node)?.is_request() {
            return Err(PlanError::HomeNode(node));
        }
        if self.slots[node].tour.is_some() {
            return Err(PlanError::AlreadyPlanned(node));
        }
        Ok(())
    }

    fn check_movable(&self, node: NodeId) -> Result<(), PlanError> {
        if !self.check_known(node)?.is_request() {
            return Err(PlanError::HomeNode(node));
        }
        let slot = &self.slots[node];
        if slot.tour.is_none() {
            return Err(PlanError::NotInTour(node));
        }
        if slot.frozen {
            return Err(PlanError::FrozenNodeViolation(node));
        }
        Ok(())
    }

    /// Successor of `pred` when the link after it may be changed.
    fn open_link(&self, pred: NodeId) -> Result<NodeId, PlanError> {
        self.check_known(pred)?;
        let slot = &self.slots[pred];
        if slot.tour.is_none() {
            return Err(PlanError::NotInTour(pred));
        }
        let succ = slot.succ.ok_or(PlanError::HomeNode(pred))?;
        if self.slots[succ].frozen {
            return Err(PlanError::FrozenNodeViolation(succ));
        }
        Ok(succ)
    }

    fn link_between(&mut self, r: usize, pred: NodeId, node: NodeId, succ: NodeId) {
        self.slots[pred].succ = Some(node);
        self.slots[succ].pred = Some(node);
        let s = &mut self.slots[node];
        s.pred = Some(pred);
        s.succ = Some(succ);
        s.tour = Some(r);
        s.frozen = false;
    }

    /// Detaches a planned, non-home node; returns its tour and former successor.
    fn unlink(&mut self, node: NodeId) -> (usize, NodeId) {
        let slot = self.slots[node];
        if let Some(p) = slot.pred {
            self.slots[p].succ = slot.succ;
        }
        if let Some(s) = slot.succ {
            self.slots[s].pred = slot.pred;
        }
        self.slots[node] = Slot::EMPTY;
        let tour = slot.tour.unwrap_or_default();
        (tour, slot.succ.unwrap_or(self.tours[tour].end))
    }

    /// Forward pass from `from` to the end, backward pass over the whole
    /// tour, then tour totals.
    fn propagate(&mut self, r: usize, from: NodeId) {
        let inst = Arc::clone(&self.instance);
        let nodes = inst.nodes();

        let mut cur = Some(from);
        while let Some(n) = cur {
            let pred = self.slots[n].pred;
            let (pred_departure, pred_load) = pred
                .map(|p| (self.slots[p].departure, self.slots[p].load))
                .unwrap_or((0.0, 0));
            let node = &nodes[n];
            let s = &mut self.slots[n];
            if !s.frozen {
                if let Some(p) = pred {
                    s.arrival = pred_departure + inst.travel_time(p, n);
                    s.departure = node.earliest_start(s.arrival) + node.service_duration();
                }
            }
            s.load = pred_load + node.demand();
            cur = s.succ;
        }

        let mut cur = Some(self.tours[r].end);
        while let Some(n) = cur {
            let node = &nodes[n];
            let latest = match self.slots[n].succ {
                None => node.due(),
                Some(s) => {
                    let bound =
                        self.slots[s].latest_arrival - inst.travel_time(n, s) - node.service_duration();
                    let ready = node.time_window().map_or(f64::NEG_INFINITY, |tw| tw.ready());
                    if bound + EPS < ready {
                        f64::NEG_INFINITY
                    } else {
                        bound.min(node.due())
                    }
                }
            };
            self.slots[n].latest_arrival = latest;
            cur = self.slots[n].pred;
        }

        let mut distance = 0.0;
        let mut len = 0;
        let mut load = 0;
        let mut prev: Option<NodeId> = None;
        let mut cur = Some(self.tours[r].start);
        while let Some(n) = cur {
            if let Some(p) = prev {
                distance += inst.distance(p, n);
            }
            if inst.is_request(n) {
                len += 1;
                load += nodes[n].demand();
            }
            prev = Some(n);
            cur = self.slots[n].succ;
        }
        let t = &mut self.tours[r];
        t.distance = distance;
        t.len = len;
        t.load = load;
    }
}
