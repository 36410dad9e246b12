use thiserror::Error;

use crate::models::NodeId;

/// Failure of a plan mutation. A failed mutation leaves the plan unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The operation would change a frozen node or a frozen link.
    #[error("node {0} is frozen")]
    FrozenNodeViolation(NodeId),

    #[error("node {0} is already frozen")]
    AlreadyFrozen(NodeId),

    /// Freezing requires the predecessor to be frozen first.
    #[error("predecessor of node {0} is not frozen")]
    FreezeOutOfOrder(NodeId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} is not in any tour")]
    NotInTour(NodeId),

    #[error("node {0} is already planned")]
    AlreadyPlanned(NodeId),

    /// Home (start/end) nodes cannot be moved or inserted after the end.
    #[error("node {0} is a home node")]
    HomeNode(NodeId),

    #[error("freezing is not supported by this plan")]
    FreezingDisabled,
}
