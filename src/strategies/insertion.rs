//! Feasible insertion positions shared by the reference strategies.

use std::iter;

use crate::models::NodeId;
use crate::plan::GiantTour;

/// Nodes of a tour after which a request may be inserted: the frontier and
/// every later node before the end.
pub fn insertion_points(plan: &GiantTour, resource: usize) -> impl Iterator<Item = NodeId> + '_ {
    let (first, end) = plan
        .tour(resource)
        .map_or((None, None), |t| (Some(t.frontier()), Some(t.end())));
    iter::successors(first, move |&n| plan.succ(n)).take_while(move |&n| Some(n) != end)
}

/// Cheapest feasible position of `node` over all tours, as
/// `(predecessor, cost increase)`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use msa_routing::models::{Instance, Node, Resource};
/// use msa_routing::plan::GiantTour;
/// use msa_routing::strategies::cheapest_insertion;
///
/// let instance = Arc::new(
///     Instance::builder()
///         .resource(Resource::new(0, 10))
///         .resource(Resource::new(1, 10).with_home(10.0, 0.0))
///         .request(Node::request(0, 9.0, 0.0, 0.0))
///         .build()
///         .unwrap(),
/// );
/// let plan = GiantTour::new(instance.clone());
/// let (pred, cost) = cheapest_insertion(&plan, 0).unwrap();
/// assert_eq!(pred, instance.resource(1).unwrap().start_node());
/// assert!((cost - 2.0).abs() < 1e-10);
/// ```
pub fn cheapest_insertion(plan: &GiantTour, node: NodeId) -> Option<(NodeId, f64)> {
    (0..plan.tours().len())
        .filter_map(|r| best_in_tour(plan, r, node))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Best feasible position of `node` in each tour, sorted by ascending cost.
pub fn insertion_candidates(plan: &GiantTour, node: NodeId) -> Vec<(NodeId, f64)> {
    let mut candidates: Vec<(NodeId, f64)> = (0..plan.tours().len())
        .filter_map(|r| best_in_tour(plan, r, node))
        .collect();
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
    candidates
}

fn best_in_tour(plan: &GiantTour, resource: usize, node: NodeId) -> Option<(NodeId, f64)> {
    insertion_points(plan, resource)
        .filter(|&p| plan.can_insert(p, node))
        .map(|p| (p, plan.insertion_cost(p, node)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}
