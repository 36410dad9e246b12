//! Nodes, time windows and capability requirements.

use serde::{Deserialize, Serialize};

/// Stable identifier of a node inside an [`Instance`](super::Instance).
pub type NodeId = usize;

/// A time window constraint for service at a node.
///
/// A resource must arrive no later than `due` and may arrive as early as
/// `ready` (waiting is allowed if early).
///
/// # Examples
///
/// ```
/// use msa_routing::models::TimeWindow;
///
/// let tw = TimeWindow::new(100.0, 200.0).unwrap();
/// assert!(tw.contains(150.0));
/// assert_eq!(tw.earliest_start(80.0), 100.0);
/// assert!(tw.is_violated(250.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    ready: f64,
    due: f64,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// Returns `None` if `ready > due` or either value is non-finite.
    pub fn new(ready: f64, due: f64) -> Option<Self> {
        if !ready.is_finite() || !due.is_finite() || ready > due {
            return None;
        }
        Some(Self { ready, due })
    }

    /// Earliest allowable start of service.
    pub fn ready(&self) -> f64 {
        self.ready
    }

    /// Latest allowable arrival time.
    pub fn due(&self) -> f64 {
        self.due
    }

    /// Returns `true` if the given time falls within this window.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.ready && time <= self.due
    }

    /// Service start when arriving at `arrival` (waits for `ready` if early).
    pub fn earliest_start(&self, arrival: f64) -> f64 {
        arrival.max(self.ready)
    }

    /// Returns `true` if arriving at the given time violates this window.
    pub fn is_violated(&self, arrival: f64) -> bool {
        arrival > self.due
    }
}

/// Skill, tool and spare-part capabilities as a bit set.
///
/// A resource can serve a node when its capabilities cover every bit the
/// node requires.
///
/// ```
/// use msa_routing::models::Capabilities;
///
/// let tech = Capabilities::from_bits(0b0111);
/// assert!(tech.covers(Capabilities::from_bits(0b0101)));
/// assert!(!tech.covers(Capabilities::from_bits(0b1000)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities(u64);

impl Capabilities {
    /// No capability at all (also: no requirement).
    pub const NONE: Capabilities = Capabilities(0);

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Builds a set from individual capability indices (0..64).
    pub fn of(indices: &[u32]) -> Self {
        Self(indices.iter().fold(0u64, |acc, &i| acc | (1u64 << (i % 64))))
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Returns `true` if every capability in `required` is present in `self`.
    pub fn covers(&self, required: Capabilities) -> bool {
        self.0 & required.0 == required.0
    }
}

/// The role a node plays in the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Departure from the home of the given resource.
    Start { resource: usize },
    /// Return to the home of the given resource (distinct duplicate of the start).
    End { resource: usize },
    /// A service request.
    Request,
}

/// A visit target: a service request or a resource's home.
///
/// # Examples
///
/// ```
/// use msa_routing::models::{Capabilities, Node, TimeWindow};
///
/// let n = Node::request(4, 10.0, 20.0, 15.0)
///     .with_demand(2)
///     .with_release_time(30.0)
///     .with_requirements(Capabilities::of(&[1]))
///     .with_time_window(TimeWindow::new(0.0, 500.0).unwrap());
/// assert!(n.is_request());
/// assert_eq!(n.release_time(), 30.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    x: f64,
    y: f64,
    kind: NodeKind,
    demand: i32,
    service_duration: f64,
    time_window: Option<TimeWindow>,
    release_time: f64,
    requirements: Capabilities,
}

impl Node {
    /// Creates a request node with the given service duration.
    pub fn request(id: NodeId, x: f64, y: f64, service_duration: f64) -> Self {
        Self {
            id,
            x,
            y,
            kind: NodeKind::Request,
            demand: 0,
            service_duration,
            time_window: None,
            release_time: 0.0,
            requirements: Capabilities::NONE,
        }
    }

    /// Creates a home node (start or end) for a resource.
    pub(crate) fn home(id: NodeId, x: f64, y: f64, kind: NodeKind) -> Self {
        Self {
            id,
            x,
            y,
            kind,
            demand: 0,
            service_duration: 0.0,
            time_window: None,
            release_time: 0.0,
            requirements: Capabilities::NONE,
        }
    }

    /// Sets a time window for this node.
    pub fn with_time_window(mut self, tw: TimeWindow) -> Self {
        self.time_window = Some(tw);
        self
    }

    /// Sets the demand (capacity units consumed when served).
    pub fn with_demand(mut self, demand: i32) -> Self {
        self.demand = demand;
        self
    }

    /// Sets the time at which the request becomes known.
    pub fn with_release_time(mut self, t: f64) -> Self {
        self.release_time = t;
        self
    }

    /// Sets the capabilities a resource needs to serve this node.
    pub fn with_requirements(mut self, req: Capabilities) -> Self {
        self.requirements = req;
        self
    }

    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_request(&self) -> bool {
        self.kind == NodeKind::Request
    }

    pub fn demand(&self) -> i32 {
        self.demand
    }

    pub fn service_duration(&self) -> f64 {
        self.service_duration
    }

    pub fn time_window(&self) -> Option<&TimeWindow> {
        self.time_window.as_ref()
    }

    /// Latest allowed arrival (`+inf` without a time window).
    pub fn due(&self) -> f64 {
        self.time_window.map_or(f64::INFINITY, |tw| tw.due())
    }

    /// Start of service when arriving at `arrival`.
    pub fn earliest_start(&self, arrival: f64) -> f64 {
        self.time_window
            .map_or(arrival, |tw| tw.earliest_start(arrival))
    }

    pub fn release_time(&self) -> f64 {
        self.release_time
    }

    pub fn requirements(&self) -> Capabilities {
        self.requirements
    }

    /// Euclidean distance to another node.
    pub fn distance_to(&self, other: &Node) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_window_invalid() {
        assert!(TimeWindow::new(20.0, 10.0).is_none());
        assert!(TimeWindow::new(f64::NAN, 10.0).is_none());
        assert!(TimeWindow::new(10.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_time_window_bounds() {
        let tw = TimeWindow::new(10.0, 20.0).expect("valid");
        assert!(tw.contains(10.0));
        assert!(tw.contains(20.0));
        assert!(!tw.contains(20.1));
        assert!(!tw.is_violated(20.0));
        assert!(tw.is_violated(20.1));
        assert_eq!(tw.earliest_start(5.0), 10.0);
        assert_eq!(tw.earliest_start(15.0), 15.0);
    }

    #[test]
    fn test_capabilities() {
        let c = Capabilities::of(&[0, 3]);
        assert_eq!(c.bits(), 0b1001);
        assert!(c.covers(Capabilities::NONE));
        assert!(c.covers(Capabilities::of(&[3])));
        assert!(!c.covers(Capabilities::of(&[1])));
    }

    #[test]
    fn test_node_defaults() {
        let n = Node::request(3, 1.0, 2.0, 5.0);
        assert!(n.is_request());
        assert_eq!(n.demand(), 0);
        assert_eq!(n.due(), f64::INFINITY);
        assert_eq!(n.earliest_start(7.0), 7.0);
    }

    #[test]
    fn test_node_distance() {
        let a = Node::request(0, 0.0, 0.0, 0.0);
        let b = Node::request(1, 3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
        assert!((b.distance_to(&a) - 5.0).abs() < 1e-10);
    }
}
