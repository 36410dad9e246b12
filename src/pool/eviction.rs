//! Admission policies for a full pool.

use super::ScenarioSummary;

/// Decides which member leaves a full pool to admit a candidate.
///
/// Returns the index of the member to evict, or `None` to reject the
/// candidate.
pub trait EvictionPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn select_victim(&self, candidate: &ScenarioSummary, members: &[ScenarioSummary])
        -> Option<usize>;
}

/// Never evicts: a full pool rejects every candidate.
pub struct RejectWhenFull;

impl EvictionPolicy for RejectWhenFull {
    fn name(&self) -> &str {
        "reject_when_full"
    }

    fn select_victim(&self, _: &ScenarioSummary, _: &[ScenarioSummary]) -> Option<usize> {
        None
    }
}

/// Evicts the most expensive member if the candidate is cheaper.
pub struct WorstCost;

impl EvictionPolicy for WorstCost {
    fn name(&self) -> &str {
        "worst_cost"
    }

    fn select_victim(
        &self,
        candidate: &ScenarioSummary,
        members: &[ScenarioSummary],
    ) -> Option<usize> {
        let (idx, worst) = members
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cost().total_cmp(&b.1.cost()))?;
        (candidate.cost() < worst.cost()).then_some(idx)
    }
}

/// Evicts a member from the most crowded group of scenarios sharing the
/// same next visits, preferring the most expensive one.
///
/// The candidate is rejected when it would itself join the most crowded
/// group without being cheaper than that group's worst member.
pub struct LeastDiverse;

impl LeastDiverse {
    fn crowding(target: &ScenarioSummary, all: &[&ScenarioSummary]) -> usize {
        all.iter()
            .filter(|s| s.next_visits() == target.next_visits())
            .count()
    }
}

impl EvictionPolicy for LeastDiverse {
    fn name(&self) -> &str {
        "least_diverse"
    }

    fn select_victim(
        &self,
        candidate: &ScenarioSummary,
        members: &[ScenarioSummary],
    ) -> Option<usize> {
        let all: Vec<&ScenarioSummary> = members.iter().chain(std::iter::once(candidate)).collect();
        let (idx, victim) = members.iter().enumerate().max_by(|a, b| {
            Self::crowding(a.1, &all)
                .cmp(&Self::crowding(b.1, &all))
                .then(a.1.cost().total_cmp(&b.1.cost()))
        })?;
        let victim_crowding = Self::crowding(victim, &all);
        let candidate_crowding = Self::crowding(candidate, &all);
        if candidate_crowding > victim_crowding
            || (candidate_crowding == victim_crowding && candidate.cost() >= victim.cost())
        {
            return None;
        }
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::models::{Instance, Node, Resource};
    use crate::plan::Scenario;

    /// Summaries whose single tour visits `first` (if any) and costs `penalty`.
    fn summary(first: Option<usize>, unassigned: usize) -> ScenarioSummary {
        let instance = Arc::new(
            Instance::builder()
                .resource(Resource::new(0, 10))
                .request(Node::request(0, 0.0, 0.0, 0.0))
                .request(Node::request(1, 0.0, 0.0, 0.0))
                .request(Node::request(2, 0.0, 0.0, 0.0))
                .build()
                .expect("valid"),
        );
        let mut s = Scenario::new(instance, 10.0);
        if let Some(n) = first {
            let start = s.plan().tour(0).expect("tour").start();
            s.insert_after(start, n).expect("valid");
        }
        for n in (0..unassigned).filter(|&n| Some(n) != first) {
            s.add_request(n).expect("valid");
        }
        ScenarioSummary::of(&s)
    }

    #[test]
    fn test_reject_when_full() {
        let members = vec![summary(None, 3)];
        assert_eq!(RejectWhenFull.select_victim(&summary(None, 0), &members), None);
    }

    #[test]
    fn test_worst_cost() {
        let members = vec![summary(None, 1), summary(None, 3), summary(None, 2)];
        assert_eq!(WorstCost.select_victim(&summary(None, 0), &members), Some(1));
        assert_eq!(WorstCost.select_victim(&summary(None, 3), &members), None);
        assert_eq!(WorstCost.select_victim(&summary(None, 0), &[]), None);
    }

    #[test]
    fn test_least_diverse_evicts_from_crowded_group() {
        let members = vec![
            summary(Some(0), 0),
            summary(Some(0), 2),
            summary(Some(1), 0),
        ];
        // candidate brings a new next visit: evict the worst of the crowded group
        assert_eq!(LeastDiverse.select_victim(&summary(Some(2), 0), &members), Some(1));
    }

    #[test]
    fn test_least_diverse_rejects_redundant_candidate() {
        let members = vec![summary(Some(0), 0), summary(Some(0), 0), summary(Some(1), 0)];
        assert_eq!(LeastDiverse.select_victim(&summary(Some(0), 3), &members), None);
    }
}
