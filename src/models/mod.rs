//! Domain model types for dynamic routing.
//!
//! Provides the static side of a problem: request and home nodes with time
//! windows and capability requirements, resources with capacity and shifts,
//! and the [`Instance`] that ties them to a travel-time matrix.

mod instance;
mod node;
mod resource;

pub use instance::{Instance, InstanceBuilder};
pub use node::{Capabilities, Node, NodeId, NodeKind, TimeWindow};
pub use resource::Resource;
