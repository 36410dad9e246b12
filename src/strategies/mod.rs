//! Reference implementations of every strategy role.
//!
//! | Role | Implementation |
//! |------|----------------|
//! | Generator | [`NearestNeighborGenerator`] |
//! | Optimizer | [`AlnsOptimizer`] |
//! | Updater | [`InsertionUpdater`] |
//! | Validator | [`InsertionValidator`] |
//! | Pool cleaner | [`ConsistencyCleaner`] |
//! | Request sampler | [`UniformRequestSampler`] |
//! | Solution builder | [`ConsensusBuilder`], [`BestScenarioBuilder`] |

pub mod alns;
mod builder;
mod cleaner;
mod generator;
mod insertion;
mod sampler;
mod updater;
mod validator;

pub use alns::AlnsOptimizer;
pub use builder::{BestScenarioBuilder, ConsensusBuilder};
pub use cleaner::ConsistencyCleaner;
pub use generator::NearestNeighborGenerator;
pub use insertion::{cheapest_insertion, insertion_candidates, insertion_points};
pub use sampler::UniformRequestSampler;
pub use updater::InsertionUpdater;
pub use validator::InsertionValidator;
