//! Scenario evaluator that recomputes timing and load and checks constraints.

use crate::models::{Instance, NodeId};
use crate::plan::{GiantTour, EPS};

/// A type of constraint violation in a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationType {
    /// Cumulative demand exceeds the resource's capacity.
    CapacityExceeded {
        resource: usize,
        load: i32,
        capacity: i32,
    },
    /// Arrival after the node's time window closes.
    TimeWindowViolated { node: NodeId, arrival: f64, due: f64 },
    /// The resource lacks a capability the node requires.
    CapabilityMissing { resource: usize, node: NodeId },
    /// Recorded arrival of an unfrozen node differs from the propagated one.
    ScheduleDrift {
        node: NodeId,
        recorded: f64,
        expected: f64,
    },
}

/// A constraint violation in a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: ViolationType,
}

impl Violation {
    pub fn new(kind: ViolationType) -> Self {
        Self { kind }
    }
}

/// Walks every tour of a plan and reports violated constraints.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use msa_routing::models::{Instance, Node, Resource, TimeWindow};
/// use msa_routing::plan::GiantTour;
/// use msa_routing::evaluation::{ScenarioEvaluator, ViolationType};
///
/// let instance = Arc::new(
///     Instance::builder()
///         .resource(Resource::new(0, 100))
///         .request(
///             Node::request(0, 3.0, 4.0, 0.0)
///                 .with_time_window(TimeWindow::new(0.0, 2.0).unwrap()),
///         )
///         .build()
///         .unwrap(),
/// );
/// let mut plan = GiantTour::new(instance.clone());
/// plan.insert_after(instance.resource(0).unwrap().start_node(), 0).unwrap();
///
/// let violations = ScenarioEvaluator::new(&instance).evaluate(&plan);
/// assert_eq!(violations.len(), 1);
/// assert!(matches!(violations[0].kind, ViolationType::TimeWindowViolated { node: 0, .. }));
/// ```
pub struct ScenarioEvaluator<'a> {
    instance: &'a Instance,
}

impl<'a> ScenarioEvaluator<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        Self { instance }
    }

    /// Evaluates every tour of the plan.
    pub fn evaluate(&self, plan: &GiantTour) -> Vec<Violation> {
        (0..plan.tours().len())
            .flat_map(|r| self.evaluate_tour(plan, r))
            .collect()
    }

    /// Evaluates one tour.
    pub fn evaluate_tour(&self, plan: &GiantTour, resource: usize) -> Vec<Violation> {
        let mut violations = Vec::new();
        let Some(vehicle) = self.instance.resource(resource) else {
            return violations;
        };
        let nodes = self.instance.nodes();
        let mut load: i32 = 0;
        let mut prev: Option<(NodeId, f64)> = None;

        for n in plan.iter(resource) {
            let node = &nodes[n];
            let recorded = plan.arrival(n).unwrap_or_default();
            let arrival = match prev {
                Some((p, departure)) if !plan.is_frozen(n) => {
                    let expected = departure + self.instance.travel_time(p, n);
                    if (expected - recorded).abs() > EPS {
                        violations.push(Violation::new(ViolationType::ScheduleDrift {
                            node: n,
                            recorded,
                            expected,
                        }));
                    }
                    expected
                }
                _ => recorded,
            };

            if arrival > node.due() + EPS {
                violations.push(Violation::new(ViolationType::TimeWindowViolated {
                    node: n,
                    arrival,
                    due: node.due(),
                }));
            }
            if node.is_request() && !self.instance.can_serve(resource, n) {
                violations.push(Violation::new(ViolationType::CapabilityMissing {
                    resource,
                    node: n,
                }));
            }

            let departure = if plan.is_frozen(n) {
                plan.departure(n).unwrap_or(arrival)
            } else {
                node.earliest_start(arrival) + node.service_duration()
            };
            load += node.demand();
            prev = Some((n, departure));
        }

        if load > vehicle.capacity() {
            violations.push(Violation::new(ViolationType::CapacityExceeded {
                resource,
                load,
                capacity: vehicle.capacity(),
            }));
        }
        violations
    }
}
