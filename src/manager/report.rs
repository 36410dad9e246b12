use serde::{Deserialize, Serialize};

use crate::models::NodeId;
use crate::plan::ScenarioId;

/// Why a scenario was dropped during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCause {
    /// The strategy reported that the scenario cannot follow the event.
    Rejected,
    /// The strategy returned an error.
    Strategy(String),
    /// The strategy panicked.
    Panicked(String),
}

/// Outcome of one sweep over the pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Scenarios actually removed from the pool.
    pub removed: Vec<ScenarioId>,
    pub failures: Vec<(ScenarioId, FailureCause)>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.removed.is_empty()
    }

    pub(crate) fn merge(&mut self, other: SweepReport) {
        self.removed.extend(other.removed);
        self.failures.extend(other.failures);
    }
}

/// Outcome of a request admission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdmissionReport {
    pub accepted: Vec<NodeId>,
    pub rejected: Vec<NodeId>,
    /// Insertion sweep of the accepted requests.
    pub sweep: SweepReport,
}
