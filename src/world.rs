//! Dynamic state of reality: released requests, commitments and service.
//!
//! Scenarios are speculative; the [`World`] is what actually happened. Every
//! irrevocable decision is recorded here first and then enforced in the
//! scenario pool.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{Instance, NodeId, NodeKind};

/// Real-world status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Not yet known to the dispatcher.
    Unreleased,
    /// Known and accepted, not yet committed to a resource.
    Released,
    /// Committed as a resource's next visit.
    Assigned { resource: usize },
    InService { resource: usize },
    Served { resource: usize },
    /// Refused at admission.
    Rejected,
}

/// A committed visit with its frozen schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub node: NodeId,
    pub arrival: f64,
    pub departure: f64,
}

/// An irrevocable decision: `resource` visits `node` next, arriving no
/// earlier than `not_before`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub resource: usize,
    pub node: NodeId,
    pub not_before: f64,
}

impl Commitment {
    pub fn new(resource: usize, node: NodeId, not_before: f64) -> Self {
        Self {
            resource,
            node,
            not_before,
        }
    }
}

/// Real-world state of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    active: bool,
    visits: Vec<Visit>,
    served: Vec<NodeId>,
    in_service: Option<NodeId>,
}

impl ResourceState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Committed visits in order, starting with the home departure.
    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn last_visit(&self) -> Option<&Visit> {
        self.visits.last()
    }

    pub fn served(&self) -> &[NodeId] {
        &self.served
    }

    pub fn in_service(&self) -> Option<NodeId> {
        self.in_service
    }

    /// Last committed node that has not been served yet.
    pub fn assigned(&self) -> Option<NodeId> {
        self.visits
            .iter()
            .skip(1)
            .map(|v| v.node)
            .rfind(|n| !self.served.contains(n))
    }
}

/// What has actually happened so far.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use msa_routing::models::{Instance, Node, Resource};
/// use msa_routing::world::{Commitment, RequestStatus, World};
///
/// let instance = Arc::new(
///     Instance::builder()
///         .resource(Resource::new(0, 10))
///         .request(Node::request(0, 3.0, 4.0, 2.0))
///         .build()
///         .unwrap(),
/// );
/// let mut world = World::new(instance);
/// world.release(0).unwrap();
/// let visit = world.commit(&Commitment::new(0, 0, 10.0)).unwrap();
/// assert_eq!(visit.arrival, 10.0);
/// assert_eq!(visit.departure, 12.0);
/// assert_eq!(world.status(0), Some(RequestStatus::Assigned { resource: 0 }));
/// ```
#[derive(Debug, Clone)]
pub struct World {
    instance: Arc<Instance>,
    statuses: Vec<RequestStatus>,
    resources: Vec<ResourceState>,
    clock: f64,
}

impl World {
    pub fn new(instance: Arc<Instance>) -> Self {
        let resources = instance
            .resources()
            .iter()
            .map(|r| ResourceState {
                active: false,
                visits: vec![Visit {
                    node: r.start_node(),
                    arrival: r.available_from(),
                    departure: r.available_from(),
                }],
                served: Vec::new(),
                in_service: None,
            })
            .collect();
        Self {
            statuses: vec![RequestStatus::Unreleased; instance.num_requests()],
            resources,
            clock: 0.0,
            instance,
        }
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.clock
    }

    /// Moves the clock forward; returns `false` if `t` is not later.
    pub fn advance_to(&mut self, t: f64) -> bool {
        if t > self.clock {
            self.clock = t;
            true
        } else {
            false
        }
    }

    /// Status of a request; `None` for home nodes and unknown ids.
    pub fn status(&self, node: NodeId) -> Option<RequestStatus> {
        self.statuses.get(node).copied()
    }

    pub fn resource(&self, resource: usize) -> Option<&ResourceState> {
        self.resources.get(resource)
    }

    pub fn resources(&self) -> &[ResourceState] {
        &self.resources
    }

    pub fn committed(&self, resource: usize) -> &[Visit] {
        self.resources
            .get(resource)
            .map(|r| r.visits.as_slice())
            .unwrap_or_default()
    }

    /// Requests known to reality that are not rejected.
    pub fn is_known(&self, node: NodeId) -> bool {
        !matches!(
            self.status(node),
            None | Some(RequestStatus::Unreleased) | Some(RequestStatus::Rejected)
        )
    }

    /// Released requests still waiting for a commitment.
    pub fn pending(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids_with(|s| s == RequestStatus::Released)
    }

    /// Requests that became known (accepted) so far, whatever their progress.
    pub fn known(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.statuses.len()).filter(|&n| self.is_known(n))
    }

    /// Requests not released yet.
    pub fn unreleased(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids_with(|s| s == RequestStatus::Unreleased)
    }

    pub fn num_served(&self) -> usize {
        self.ids_with(|s| matches!(s, RequestStatus::Served { .. }))
            .count()
    }

    fn ids_with<F>(&self, pred: F) -> impl Iterator<Item = NodeId> + '_
    where
        F: Fn(RequestStatus) -> bool + 'static,
    {
        self.statuses
            .iter()
            .enumerate()
            .filter(move |(_, s)| pred(**s))
            .map(|(n, _)| n)
    }

    /// Marks a request as released. Returns `false` if it already was.
    pub fn release(&mut self, node: NodeId) -> Result<bool, EngineError> {
        let status = self
            .statuses
            .get_mut(node)
            .ok_or(EngineError::UnknownNode(node))?;
        match *status {
            RequestStatus::Unreleased => {
                *status = RequestStatus::Released;
                Ok(true)
            }
            RequestStatus::Rejected => Err(EngineError::MalformedCommitment(format!(
                "request {node} was rejected"
            ))),
            _ => Ok(false),
        }
    }

    pub fn reject(&mut self, node: NodeId) -> Result<(), EngineError> {
        let status = self
            .statuses
            .get_mut(node)
            .ok_or(EngineError::UnknownNode(node))?;
        *status = RequestStatus::Rejected;
        Ok(())
    }

    /// Checks a commitment against reality and computes its schedule.
    pub fn validate(&self, c: &Commitment) -> Result<Visit, EngineError> {
        let malformed = |why: String| Err(EngineError::MalformedCommitment(why));
        let Some(resource) = self.instance.resource(c.resource) else {
            return malformed(format!("unknown resource {}", c.resource));
        };
        let Some(node) = self.instance.node(c.node) else {
            return malformed(format!("unknown node {}", c.node));
        };
        let state = &self.resources[c.resource];
        let Some(prev) = state.last_visit() else {
            return malformed(format!("resource {} has no start", c.resource));
        };
        if prev.node == resource.end_node() {
            return malformed(format!("resource {} already returned home", c.resource));
        }
        match node.kind() {
            NodeKind::Start { .. } => {
                return malformed(format!("node {} is a start node", c.node));
            }
            NodeKind::End { resource: owner } if owner != c.resource => {
                return malformed(format!(
                    "node {} is the home of resource {owner}",
                    c.node
                ));
            }
            NodeKind::End { .. } => {}
            NodeKind::Request => {
                match self.statuses[c.node] {
                    RequestStatus::Released => {}
                    other => {
                        return malformed(format!("request {} is {other:?}", c.node));
                    }
                }
                if !self.instance.can_serve(c.resource, c.node) {
                    return malformed(format!(
                        "resource {} cannot serve request {}",
                        c.resource, c.node
                    ));
                }
            }
        }
        if !c.not_before.is_finite() {
            return malformed("commitment time is not finite".into());
        }

        let arrival = c
            .not_before
            .max(prev.departure + self.instance.travel_time(prev.node, c.node));
        let departure = node.earliest_start(arrival) + node.service_duration();
        Ok(Visit {
            node: c.node,
            arrival,
            departure,
        })
    }

    /// Validates and records a commitment.
    pub fn commit(&mut self, c: &Commitment) -> Result<Visit, EngineError> {
        let visit = self.validate(c)?;
        if let Some(status) = self.statuses.get_mut(c.node) {
            *status = RequestStatus::Assigned {
                resource: c.resource,
            };
        }
        self.resources[c.resource].visits.push(visit);
        Ok(visit)
    }

    /// The resource starts (or resumes) working.
    pub fn start_service(&mut self, resource: usize) -> Result<(), EngineError> {
        self.resource_mut(resource)?.active = true;
        Ok(())
    }

    /// The resource becomes idle.
    pub fn stop_service(&mut self, resource: usize) -> Result<(), EngineError> {
        self.resource_mut(resource)?.active = false;
        Ok(())
    }

    /// Service begins at an assigned request.
    pub fn start_of_service(&mut self, resource: usize, node: NodeId, t: f64) -> Result<(), EngineError> {
        self.resource_mut(resource)?;
        let status = self
            .statuses
            .get_mut(node)
            .ok_or(EngineError::UnknownNode(node))?;
        if *status != (RequestStatus::Assigned { resource }) {
            return Err(EngineError::MalformedCommitment(format!(
                "request {node} is not assigned to resource {resource}"
            )));
        }
        *status = RequestStatus::InService { resource };
        self.resources[resource].in_service = Some(node);
        self.advance_to(t);
        Ok(())
    }

    /// Service ends at an assigned or in-service request, which becomes served.
    pub fn end_of_service(&mut self, resource: usize, node: NodeId, t: f64) -> Result<(), EngineError> {
        self.resource_mut(resource)?;
        let status = self
            .statuses
            .get_mut(node)
            .ok_or(EngineError::UnknownNode(node))?;
        match *status {
            RequestStatus::Assigned { resource: r } | RequestStatus::InService { resource: r }
                if r == resource => {}
            other => {
                return Err(EngineError::MalformedCommitment(format!(
                    "request {node} cannot end service from {other:?}"
                )))
            }
        }
        *status = RequestStatus::Served { resource };
        let state = &mut self.resources[resource];
        state.in_service = None;
        state.served.push(node);
        self.advance_to(t);
        Ok(())
    }

    fn resource_mut(&mut self, resource: usize) -> Result<&mut ResourceState, EngineError> {
        self.resources
            .get_mut(resource)
            .ok_or(EngineError::UnknownResource(resource))
    }
}
