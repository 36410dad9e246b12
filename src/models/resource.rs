//! Mobile resources (technicians, vehicles).

use serde::{Deserialize, Serialize};

use super::{Capabilities, NodeId};

/// A technician or vehicle that executes one tour per scenario.
///
/// The home location is materialised by the [`Instance`](super::Instance)
/// as two nodes: a start node and a distinct end (return) node.
///
/// # Examples
///
/// ```
/// use msa_routing::models::{Capabilities, Resource};
///
/// let r = Resource::new(0, 100)
///     .with_home(10.0, 10.0)
///     .with_capabilities(Capabilities::of(&[0, 2]))
///     .with_shift(8.0, 480.0);
/// assert_eq!(r.capacity(), 100);
/// assert_eq!(r.available_from(), 8.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    id: usize,
    capacity: i32,
    home: (f64, f64),
    capabilities: Capabilities,
    cost_per_distance: f64,
    fixed_cost: f64,
    available_from: f64,
    shift_end: Option<f64>,
    start_node: NodeId,
    end_node: NodeId,
}

impl Resource {
    /// Creates a resource with the given id and capacity.
    ///
    /// Default: home at the origin, no capabilities, cost_per_distance = 1.0,
    /// no fixed cost, available from time 0 with an open-ended shift.
    pub fn new(id: usize, capacity: i32) -> Self {
        Self {
            id,
            capacity,
            home: (0.0, 0.0),
            capabilities: Capabilities::NONE,
            cost_per_distance: 1.0,
            fixed_cost: 0.0,
            available_from: 0.0,
            shift_end: None,
            start_node: 0,
            end_node: 0,
        }
    }

    pub fn with_home(mut self, x: f64, y: f64) -> Self {
        self.home = (x, y);
        self
    }

    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.capabilities = caps;
        self
    }

    pub fn with_cost_per_distance(mut self, cost: f64) -> Self {
        self.cost_per_distance = cost;
        self
    }

    pub fn with_fixed_cost(mut self, cost: f64) -> Self {
        self.fixed_cost = cost;
        self
    }

    /// Sets the working shift: availability time and latest return home.
    pub fn with_shift(mut self, from: f64, until: f64) -> Self {
        self.available_from = from;
        self.shift_end = Some(until);
        self
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    pub(crate) fn set_home_nodes(&mut self, start: NodeId, end: NodeId) {
        self.start_node = start;
        self.end_node = end;
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    pub fn home(&self) -> (f64, f64) {
        self.home
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn cost_per_distance(&self) -> f64 {
        self.cost_per_distance
    }

    pub fn fixed_cost(&self) -> f64 {
        self.fixed_cost
    }

    /// Time at which the resource leaves home.
    pub fn available_from(&self) -> f64 {
        self.available_from
    }

    /// Latest return home, if bounded.
    pub fn shift_end(&self) -> Option<f64> {
        self.shift_end
    }

    /// Node id of the home departure.
    pub fn start_node(&self) -> NodeId {
        self.start_node
    }

    /// Node id of the home return.
    pub fn end_node(&self) -> NodeId {
        self.end_node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_new() {
        let r = Resource::new(0, 200);
        assert_eq!(r.id(), 0);
        assert_eq!(r.capacity(), 200);
        assert_eq!(r.cost_per_distance(), 1.0);
        assert_eq!(r.fixed_cost(), 0.0);
        assert_eq!(r.available_from(), 0.0);
        assert!(r.shift_end().is_none());
    }

    #[test]
    fn test_resource_builder() {
        let r = Resource::new(1, 100)
            .with_home(3.0, 4.0)
            .with_cost_per_distance(1.5)
            .with_fixed_cost(50.0)
            .with_shift(10.0, 300.0);
        assert_eq!(r.home(), (3.0, 4.0));
        assert_eq!(r.cost_per_distance(), 1.5);
        assert_eq!(r.fixed_cost(), 50.0);
        assert_eq!(r.shift_end(), Some(300.0));
    }
}
