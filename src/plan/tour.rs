//! Per-resource tour headers.

use crate::models::NodeId;

use super::GiantTour;

/// Header of one resource's tour inside a [`GiantTour`].
///
/// The visit sequence itself lives in the giant tour's predecessor and
/// successor links; the header only keeps the endpoints and running totals.
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    pub(super) resource: usize,
    pub(super) start: NodeId,
    pub(super) end: NodeId,
    pub(super) frontier: NodeId,
    pub(super) len: usize,
    pub(super) distance: f64,
    pub(super) load: i32,
}

impl Tour {
    pub(super) fn new(resource: usize, start: NodeId, end: NodeId) -> Self {
        Self {
            resource,
            start,
            end,
            frontier: start,
            len: 0,
            distance: 0.0,
            load: 0,
        }
    }

    /// Index of the owning resource.
    pub fn resource(&self) -> usize {
        self.resource
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn end(&self) -> NodeId {
        self.end
    }

    /// Last frozen node; the link after it is the open next decision.
    pub fn frontier(&self) -> NodeId {
        self.frontier
    }

    /// Number of request nodes in the tour.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total travel distance from start to end.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Total demand of the visited requests.
    pub fn load(&self) -> i32 {
        self.load
    }
}

/// Iterator over a tour's nodes, from the start node to the end node.
pub struct TourIter<'a> {
    pub(super) plan: &'a GiantTour,
    pub(super) next: Option<NodeId>,
}

impl Iterator for TourIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = self.plan.succ(cur);
        Some(cur)
    }
}
