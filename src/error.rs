//! Engine-level errors.
//!
//! Only pool-wide failures and malformed input reach the caller of the
//! engine; failures of a single scenario are contained by the
//! [`ComponentManager`](crate::manager::ComponentManager) and reported in a
//! [`SweepReport`](crate::manager::SweepReport).
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`PoolExhausted`](EngineError::PoolExhausted) | `ENGINE_POOL_EXHAUSTED` | Yes |
//! | [`MalformedCommitment`](EngineError::MalformedCommitment) | `ENGINE_MALFORMED_COMMITMENT` | No |
//! | [`InvalidConfig`](EngineError::InvalidConfig) | `ENGINE_INVALID_CONFIG` | No |
//! | [`InvalidInstance`](EngineError::InvalidInstance) | `ENGINE_INVALID_INSTANCE` | No |
//! | [`UnknownResource`](EngineError::UnknownResource) | `ENGINE_UNKNOWN_RESOURCE` | No |
//! | [`UnknownNode`](EngineError::UnknownNode) | `ENGINE_UNKNOWN_NODE` | No |
//!
//! ```
//! use msa_routing::error::EngineError;
//!
//! let err = EngineError::PoolExhausted { resource: 0, node: 3 };
//! assert_eq!(err.code(), "ENGINE_POOL_EXHAUSTED");
//! assert!(err.is_recoverable());
//! ```

use thiserror::Error;

use crate::models::NodeId;

/// Error surfaced to callers of the manager and the event loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Every scenario was invalidated while enforcing a commitment.
    ///
    /// **Recoverable**: regenerating scenarios from the current world state
    /// restores the pool.
    #[error("pool exhausted while enforcing resource {resource} -> node {node}")]
    PoolExhausted { resource: usize, node: NodeId },

    /// The commitment contradicts the instance or the world state.
    #[error("malformed commitment: {0}")]
    MalformedCommitment(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    #[error("unknown resource {0}")]
    UnknownResource(usize),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}

impl EngineError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PoolExhausted { .. } => "ENGINE_POOL_EXHAUSTED",
            Self::MalformedCommitment(_) => "ENGINE_MALFORMED_COMMITMENT",
            Self::InvalidConfig(_) => "ENGINE_INVALID_CONFIG",
            Self::InvalidInstance(_) => "ENGINE_INVALID_INSTANCE",
            Self::UnknownResource(_) => "ENGINE_UNKNOWN_RESOURCE",
            Self::UnknownNode(_) => "ENGINE_UNKNOWN_NODE",
        }
    }

    /// Whether the engine can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::PoolExhausted { .. } => true,
            Self::MalformedCommitment(_)
            | Self::InvalidConfig(_)
            | Self::InvalidInstance(_)
            | Self::UnknownResource(_)
            | Self::UnknownNode(_) => false,
        }
    }
}
