//! Dense distance matrix with a travel speed.

use crate::error::EngineError;
use crate::models::{Node, NodeId};

/// Distances between every pair of nodes, plus the speed that turns them
/// into travel times.
///
/// Rows are stored contiguously and indexed by [`NodeId`]. Matrices built
/// from coordinates are Euclidean; explicit rows may be asymmetric.
///
/// # Examples
///
/// ```
/// use msa_routing::models::Node;
/// use msa_routing::distance::DistanceMatrix;
///
/// let nodes = vec![
///     Node::request(0, 0.0, 0.0, 0.0),
///     Node::request(1, 3.0, 4.0, 5.0),
/// ];
/// let dm = DistanceMatrix::from_nodes(&nodes).with_speed(2.0).unwrap();
/// assert!((dm.distance(0, 1) - 5.0).abs() < 1e-10);
/// assert!((dm.travel_time(0, 1) - 2.5).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    cells: Vec<f64>,
    nodes: usize,
    speed: f64,
}

impl DistanceMatrix {
    /// All-zero matrix over `nodes` nodes.
    pub fn new(nodes: usize) -> Self {
        Self {
            cells: vec![0.0; nodes * nodes],
            nodes,
            speed: 1.0,
        }
    }

    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut dm = Self::new(nodes.len());
        for (i, a) in nodes.iter().enumerate() {
            for (j, b) in nodes.iter().enumerate().skip(i + 1) {
                let d = a.distance_to(b);
                dm.cells[i * dm.nodes + j] = d;
                dm.cells[j * dm.nodes + i] = d;
            }
        }
        dm
    }

    /// Builds a matrix from one row per node.
    ///
    /// Every row must have one entry per node and every entry must be a
    /// finite, non-negative distance.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, EngineError> {
        let nodes = rows.len();
        let mut cells = Vec::with_capacity(nodes * nodes);
        for (from, row) in rows.into_iter().enumerate() {
            if row.len() != nodes {
                return Err(EngineError::InvalidInstance(format!(
                    "distance row {from} has {} entries, expected {nodes}",
                    row.len()
                )));
            }
            if let Some(to) = row.iter().position(|d| !d.is_finite() || *d < 0.0) {
                return Err(EngineError::InvalidInstance(format!(
                    "distance {from} -> {to} is not a non-negative number"
                )));
            }
            cells.extend(row);
        }
        Ok(Self {
            cells,
            nodes,
            speed: 1.0,
        })
    }

    /// Sets the travel speed; travel time is distance divided by speed.
    pub fn with_speed(mut self, speed: f64) -> Result<Self, EngineError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(EngineError::InvalidInstance(format!(
                "travel speed must be positive, got {speed}"
            )));
        }
        self.speed = speed;
        Ok(self)
    }

    /// # Panics
    ///
    /// Panics if either node is outside the matrix.
    pub fn distance(&self, from: NodeId, to: NodeId) -> f64 {
        self.cells[from * self.nodes + to]
    }

    pub fn travel_time(&self, from: NodeId, to: NodeId) -> f64 {
        self.distance(from, to) / self.speed
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Number of nodes covered.
    pub fn size(&self) -> usize {
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<Node> {
        vec![
            Node::request(0, 0.0, 0.0, 0.0),
            Node::request(1, 3.0, 4.0, 5.0),
            Node::request(2, 0.0, 8.0, 5.0),
        ]
    }

    #[test]
    fn test_euclidean_from_coordinates() {
        let dm = DistanceMatrix::from_nodes(&triangle());
        assert_eq!(dm.size(), 3);
        assert!((dm.distance(0, 1) - 5.0).abs() < 1e-10);
        assert!((dm.distance(2, 0) - 8.0).abs() < 1e-10);
        assert!(dm.distance(1, 1).abs() < 1e-10);
        assert!((dm.travel_time(0, 2) - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_explicit_rows_may_be_asymmetric() {
        let dm = DistanceMatrix::from_rows(vec![vec![0.0, 10.0], vec![15.0, 0.0]])
            .expect("valid");
        assert!((dm.distance(0, 1) - 10.0).abs() < 1e-10);
        assert!((dm.distance(1, 0) - 15.0).abs() < 1e-10);
    }

    #[test]
    fn test_rejects_malformed_rows() {
        let ragged = DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0]]);
        assert!(matches!(ragged, Err(EngineError::InvalidInstance(_))));
        let negative = DistanceMatrix::from_rows(vec![vec![0.0, -1.0], vec![1.0, 0.0]]);
        assert!(negative.is_err());
        let nan = DistanceMatrix::from_rows(vec![vec![f64::NAN]]);
        assert!(nan.is_err());
    }

    #[test]
    fn test_speed_scales_travel_time() {
        let dm = DistanceMatrix::from_nodes(&triangle())
            .with_speed(4.0)
            .expect("valid");
        assert!((dm.travel_time(0, 2) - 2.0).abs() < 1e-10);
        assert!((dm.distance(0, 2) - 8.0).abs() < 1e-10);
        assert!(DistanceMatrix::new(1).with_speed(0.0).is_err());
    }
}
