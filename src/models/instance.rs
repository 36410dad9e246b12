//! Problem instance: every potential node, the fleet and travel times.

use crate::distance::DistanceMatrix;
use crate::error::EngineError;

use super::{Node, NodeId, NodeKind, Resource, TimeWindow};

/// Static data of a dynamic routing problem.
///
/// All request nodes are known up front (their *release* is what happens
/// over time). Request ids are `0..num_requests()` in insertion order; each
/// resource then gets a start and an end home node.
///
/// # Examples
///
/// ```
/// use msa_routing::models::{Instance, Node, Resource};
///
/// let instance = Instance::builder()
///     .resource(Resource::new(0, 10).with_home(0.0, 0.0))
///     .request(Node::request(0, 3.0, 4.0, 1.0))
///     .request(Node::request(0, 6.0, 8.0, 1.0))
///     .build()
///     .unwrap();
/// assert_eq!(instance.num_requests(), 2);
/// let r = instance.resource(0).unwrap();
/// assert_eq!(r.start_node(), 2);
/// assert_eq!(r.end_node(), 3);
/// assert!((instance.travel_time(r.start_node(), 0) - 5.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct Instance {
    nodes: Vec<Node>,
    resources: Vec<Resource>,
    distances: DistanceMatrix,
    num_requests: usize,
}

impl Instance {
    pub fn builder() -> InstanceBuilder {
        InstanceBuilder::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, id: usize) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn num_resources(&self) -> usize {
        self.resources.len()
    }

    pub fn num_requests(&self) -> usize {
        self.num_requests
    }

    /// Ids of all request nodes.
    pub fn request_ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.num_requests
    }

    pub fn is_request(&self, id: NodeId) -> bool {
        id < self.num_requests
    }

    /// Travel time between two nodes at the matrix speed.
    pub fn travel_time(&self, from: NodeId, to: NodeId) -> f64 {
        self.distances.travel_time(from, to)
    }

    pub fn distance(&self, from: NodeId, to: NodeId) -> f64 {
        self.distances.distance(from, to)
    }

    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Returns `true` if the resource has every capability the node requires.
    pub fn can_serve(&self, resource: usize, node: NodeId) -> bool {
        match (self.resources.get(resource), self.nodes.get(node)) {
            (Some(r), Some(n)) => match n.kind() {
                NodeKind::Request => r.capabilities().covers(n.requirements()),
                NodeKind::Start { resource: owner } | NodeKind::End { resource: owner } => {
                    owner == resource
                }
            },
            _ => false,
        }
    }
}

/// Incremental builder for [`Instance`].
#[derive(Debug, Default)]
pub struct InstanceBuilder {
    resources: Vec<Resource>,
    requests: Vec<Node>,
    distances: Option<DistanceMatrix>,
}

impl InstanceBuilder {
    /// Adds a resource; its id is reassigned to its insertion index.
    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Adds a request; its id is reassigned to its insertion index.
    pub fn request(mut self, node: Node) -> Self {
        self.requests.push(node);
        self
    }

    /// Uses an explicit travel-time matrix instead of Euclidean distances.
    ///
    /// The matrix must cover requests first, then `(start, end)` per resource.
    pub fn distances(mut self, matrix: DistanceMatrix) -> Self {
        self.distances = Some(matrix);
        self
    }

    pub fn build(self) -> Result<Instance, EngineError> {
        if self.resources.is_empty() {
            return Err(EngineError::InvalidInstance(
                "at least one resource is required".into(),
            ));
        }
        let num_requests = self.requests.len();
        let mut nodes = Vec::with_capacity(num_requests + 2 * self.resources.len());
        for (i, mut n) in self.requests.into_iter().enumerate() {
            if !n.is_request() {
                return Err(EngineError::InvalidInstance(format!(
                    "node {i} is not a request"
                )));
            }
            n.set_id(i);
            nodes.push(n);
        }

        let mut resources = Vec::with_capacity(self.resources.len());
        for (ri, mut r) in self.resources.into_iter().enumerate() {
            let start = nodes.len();
            let end = start + 1;
            let (x, y) = r.home();
            nodes.push(Node::home(start, x, y, NodeKind::Start { resource: ri }));
            let mut end_node = Node::home(end, x, y, NodeKind::End { resource: ri });
            if let Some(until) = r.shift_end() {
                let tw = TimeWindow::new(r.available_from(), until).ok_or_else(|| {
                    EngineError::InvalidInstance(format!("resource {ri} has an empty shift"))
                })?;
                end_node = end_node.with_time_window(tw);
            }
            nodes.push(end_node);
            r.set_id(ri);
            r.set_home_nodes(start, end);
            resources.push(r);
        }

        let distances = match self.distances {
            Some(m) if m.size() == nodes.len() => m,
            Some(m) => {
                return Err(EngineError::InvalidInstance(format!(
                    "distance matrix has size {} but the instance has {} nodes",
                    m.size(),
                    nodes.len()
                )))
            }
            None => DistanceMatrix::from_nodes(&nodes),
        };

        Ok(Instance {
            nodes,
            resources,
            distances,
            num_requests,
        })
    }
}
