use serde::{Deserialize, Serialize};

use crate::models::NodeId;
use crate::plan::{Scenario, ScenarioId};

/// Recommended next move of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NextAction {
    Visit(NodeId),
    ReturnHome,
    /// Stay put: nothing actual to do next, or the resource is already home.
    Wait,
}

/// One recommended action per resource, synthesized from the pool.
///
/// Never mutated; the engine replaces it wholesale.
///
/// # Examples
///
/// ```
/// use msa_routing::components::DistinguishedSolution;
///
/// let none = DistinguishedSolution::none();
/// assert!(none.is_none());
/// assert_eq!(none.cost(), None);
/// assert!(none.actions().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistinguishedSolution {
    actions: Vec<NextAction>,
    source: Option<ScenarioId>,
    cost: Option<f64>,
}

impl DistinguishedSolution {
    /// The result of an empty pool.
    pub fn none() -> Self {
        Self {
            actions: Vec::new(),
            source: None,
            cost: None,
        }
    }

    /// Reads the next decision of every resource off `scenario`.
    ///
    /// The next decision is the node right after the tour's frontier.
    /// Sampled requests are not real yet and yield [`NextAction::Wait`].
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let plan = scenario.plan();
        let instance = scenario.instance();
        let actions = plan
            .tours()
            .iter()
            .map(|tour| match plan.succ(tour.frontier()) {
                Some(n) if instance.is_request(n) && !scenario.is_sampled(n) => {
                    NextAction::Visit(n)
                }
                Some(n) if instance.is_request(n) => NextAction::Wait,
                Some(_) if tour.frontier() != tour.start() => NextAction::ReturnHome,
                _ => NextAction::Wait,
            })
            .collect();
        Self {
            actions,
            source: Some(scenario.id()),
            cost: Some(scenario.cost()),
        }
    }

    pub fn is_none(&self) -> bool {
        self.source.is_none()
    }

    pub fn actions(&self) -> &[NextAction] {
        &self.actions
    }

    pub fn action(&self, resource: usize) -> Option<NextAction> {
        self.actions.get(resource).copied()
    }

    /// Scenario the actions were read from.
    pub fn source(&self) -> Option<ScenarioId> {
        self.source
    }

    pub fn cost(&self) -> Option<f64> {
        self.cost
    }
}

impl Default for DistinguishedSolution {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::models::{Instance, Node, Resource};

    fn scenario() -> Scenario {
        let instance = Instance::builder()
            .resource(Resource::new(0, 10))
            .resource(Resource::new(1, 10))
            .resource(Resource::new(2, 10))
            .request(Node::request(0, 1.0, 0.0, 0.0))
            .request(Node::request(1, 2.0, 0.0, 0.0))
            .request(Node::request(2, 3.0, 0.0, 0.0))
            .build()
            .expect("valid");
        Scenario::new(Arc::new(instance), 100.0)
    }

    #[test]
    fn test_actions_follow_frontier() {
        let mut s = scenario();
        let start = |s: &Scenario, r: usize| s.plan().tour(r).expect("tour").start();
        s.add_request(0).expect("valid");
        s.add_request(1).expect("valid");
        let s0 = start(&s, 0);
        s.insert_after(s0, 0).expect("valid");
        s.insert_after(0, 1).expect("valid");
        s.add_sampled(2).expect("valid");
        let s1 = start(&s, 1);
        s.insert_after(s1, 2).expect("valid");

        let sol = DistinguishedSolution::from_scenario(&s);
        assert_eq!(sol.action(0), Some(NextAction::Visit(0)));
        assert_eq!(sol.action(1), Some(NextAction::Wait));
        assert_eq!(sol.action(2), Some(NextAction::Wait));
        assert_eq!(sol.source(), Some(s.id()));
        assert!((sol.cost().expect("cost") - s.cost()).abs() < 1e-10);

        // after visiting both requests the next move is the way home
        s.freeze(0, 1.0, 1.0).expect("valid");
        s.freeze(1, 2.0, 2.0).expect("valid");
        let sol = DistinguishedSolution::from_scenario(&s);
        assert_eq!(sol.action(0), Some(NextAction::ReturnHome));
    }

    #[test]
    fn test_serde_roundtrip() {
        let s = scenario();
        let sol = DistinguishedSolution::from_scenario(&s);
        let json = serde_json::to_string(&sol).expect("serialize");
        let back: DistinguishedSolution = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, sol);
    }
}
