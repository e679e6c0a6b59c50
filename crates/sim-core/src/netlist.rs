//! Netlist model (C3): blocks and the per-IO-type connectivity graph.

use crate::error::{CoreError, CoreResult};
use crate::tech::TechNode;
use std::collections::BTreeMap;

/// A single netlist block: fixed area/power footprint on a given tech node.
/// Immutable after construction; blocks are re-created, not mutated, when a
/// partitioning moves them between dies.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub name: String,
    pub area: f64,
    pub power: f64,
    pub tech: TechNode,
    pub is_memory: bool,
}

impl Block {
    pub fn new(name: impl Into<String>, area: f64, power: f64, tech: TechNode, is_memory: bool) -> CoreResult<Self> {
        if area < 0.0 {
            return Err(CoreError::RangeViolation { field: "block.area", value: area, bound: ">= 0" });
        }
        if power < 0.0 {
            return Err(CoreError::RangeViolation { field: "block.power", value: power, bound: ">= 0" });
        }
        Ok(Block { name: name.into(), area, power, tech, is_memory })
    }
}

/// A square matrix over the blocks of a [`ConnectivityGraph`], row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix<T> {
    n: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Matrix<T> {
    pub fn zeroed(n: usize) -> Self {
        Matrix { n, data: vec![T::default(); n * n] }
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> CoreResult<Self> {
        let n = rows.len();
        for row in &rows {
            if row.len() != n {
                return Err(CoreError::InvalidPartition("connectivity matrix is not square".into()));
            }
        }
        Ok(Matrix { n, data: rows.into_iter().flatten().collect() })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[i * self.n + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.data[i * self.n + j] = value;
    }
}

/// Bandwidth/connectivity between blocks, broken out per IO type: how many
/// wires of that type connect each pair of blocks, and how utilized each
/// connection is.
#[derive(Clone, Debug, Default)]
pub struct ConnectivityGraph {
    block_names: Vec<String>,
    adjacency: BTreeMap<String, Matrix<i32>>,
    utilization: BTreeMap<String, Matrix<f64>>,
}

impl ConnectivityGraph {
    pub fn new(block_names: Vec<String>) -> Self {
        ConnectivityGraph { block_names, adjacency: BTreeMap::new(), utilization: BTreeMap::new() }
    }

    pub fn block_names(&self) -> &[String] {
        &self.block_names
    }

    pub fn block_count(&self) -> usize {
        self.block_names.len()
    }

    pub fn io_types(&self) -> impl Iterator<Item = &str> {
        self.adjacency.keys().map(String::as_str)
    }

    /// Inserts the adjacency and utilization matrices for one IO type.
    /// Both must be square with dimension equal to the block count.
    pub fn set_io_type(
        &mut self,
        io_type: impl Into<String>,
        adjacency: Matrix<i32>,
        utilization: Matrix<f64>,
    ) -> CoreResult<()> {
        let n = self.block_names.len();
        if adjacency.dim() != n || utilization.dim() != n {
            return Err(CoreError::InvalidPartition(format!(
                "connectivity matrices must be {n}x{n}, got adjacency {}x{} / utilization {}x{}",
                adjacency.dim(),
                adjacency.dim(),
                utilization.dim(),
                utilization.dim()
            )));
        }
        let io_type = io_type.into();
        self.adjacency.insert(io_type.clone(), adjacency);
        self.utilization.insert(io_type, utilization);
        Ok(())
    }

    pub fn adjacency(&self, io_type: &str) -> Option<&Matrix<i32>> {
        self.adjacency.get(io_type)
    }

    pub fn utilization(&self, io_type: &str) -> Option<&Matrix<f64>> {
        self.utilization.get(io_type)
    }

    /// True iff the adjacency and utilization maps share the same key set,
    /// and every matrix is N_blocks x N_blocks.
    pub fn is_consistent(&self) -> bool {
        let n = self.block_names.len();
        if self.adjacency.keys().ne(self.utilization.keys()) {
            return false;
        }
        self.adjacency.values().all(|m| m.dim() == n) && self.utilization.values().all(|m| m.dim() == n)
    }

    /// Total connection count of `io_type` crossing between partition `a`
    /// and partition `b` (or within a single partition when `a == b`),
    /// given a dense partition-id-per-block assignment.
    pub fn connections_between(&self, io_type: &str, partitions: &[usize], a: usize, b: usize) -> i32 {
        let Some(adj) = self.adjacency.get(io_type) else { return 0 };
        let n = self.block_names.len();
        let mut total = 0;
        for i in 0..n {
            if partitions[i] != a {
                continue;
            }
            for j in 0..n {
                if partitions[j] == b {
                    total += *adj.get(i, j);
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_rejects_negative_area() {
        assert!(matches!(
            Block::new("b0", -1.0, 1.0, TechNode::N7, false),
            Err(CoreError::RangeViolation { .. })
        ));
    }

    #[test]
    fn connectivity_graph_requires_square_matrices_sized_to_blocks() {
        let mut g = ConnectivityGraph::new(vec!["a".into(), "b".into(), "c".into()]);
        let bad_adj = Matrix::<i32>::zeroed(2);
        let bad_util = Matrix::<f64>::zeroed(2);
        assert!(g.set_io_type("d2d", bad_adj, bad_util).is_err());

        let adj = Matrix::<i32>::zeroed(3);
        let util = Matrix::<f64>::zeroed(3);
        g.set_io_type("d2d", adj, util).unwrap();
        assert!(g.is_consistent());
    }

    #[test]
    fn connections_between_sums_adjacency_across_partitions() {
        let mut g = ConnectivityGraph::new(vec!["a".into(), "b".into(), "c".into()]);
        let mut adj = Matrix::<i32>::zeroed(3);
        adj.set(0, 1, 4);
        adj.set(0, 2, 1);
        let util = Matrix::<f64>::zeroed(3);
        g.set_io_type("d2d", adj, util).unwrap();

        let partitions = [0usize, 1, 1];
        assert_eq!(g.connections_between("d2d", &partitions, 0, 1), 5);
        assert_eq!(g.connections_between("d2d", &partitions, 1, 0), 0);
    }
}
