//! Distances and travel times between nodes.

mod matrix;

pub use matrix::DistanceMatrix;
