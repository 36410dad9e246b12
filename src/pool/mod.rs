//! Scenario pool.
//!
//! - [`ScenarioPool`] — bounded membership with atomic batch removal and
//!   copy-on-iterate snapshots
//! - [`SharedScenario`] — a member behind an advisory exclusive lock
//! - [`EvictionPolicy`] — what happens when a full pool receives a candidate

mod eviction;
mod scenario_pool;
mod shared;

pub use eviction::{EvictionPolicy, LeastDiverse, RejectWhenFull, WorstCost};
pub use scenario_pool::ScenarioPool;
pub use shared::{ScenarioGuard, ScenarioSummary, SharedScenario};
