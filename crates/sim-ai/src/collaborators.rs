//! Reference external collaborators (C8): the `Floorplanner` and `Refiner`
//! boundary traits the GA depends on for per-candidate placement/refinement,
//! plus small deterministic reference implementations so the GA loop is
//! runnable end to end without a production placer or partitioner.

use std::collections::HashMap;

/// A partitioning problem stripped down to what a floorplanner/refiner
/// needs: a vertex weight (block area) and a weighted edge list (bandwidth
/// crossing that pair of blocks).
#[derive(Debug, Clone)]
pub struct Hypergraph {
    pub vertex_weights: Vec<f64>,
    pub edges: Vec<(usize, usize, f64)>,
}

impl Hypergraph {
    pub fn num_vertices(&self) -> usize {
        self.vertex_weights.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloorplanResult {
    pub aspect_ratios: Vec<f64>,
    pub x_locations: Vec<f64>,
    pub y_locations: Vec<f64>,
    pub success: bool,
}

pub trait Floorplanner: Send + Sync {
    fn run_floorplanner(
        &self,
        partition: &[usize],
        hypergraph: &Hypergraph,
        num_partitions: usize,
        iterations: u32,
        seed: u64,
    ) -> FloorplanResult;
}

pub trait Refiner: Send + Sync {
    /// One pass of refinement over `partition`, in place. `upper`/`lower`
    /// are per-partition vertex-weight bounds.
    fn refine(&self, hypergraph: &Hypergraph, upper: &[f64], lower: &[f64], partition: &mut [usize]);
}

/// Lays partitions left to right on a single row at unit aspect ratio; each
/// partition's side length is the square root of its summed vertex weight.
/// Fails only when some partition has no vertices assigned to it.
#[derive(Debug, Clone, Default)]
pub struct RowFloorplanner;

impl Floorplanner for RowFloorplanner {
    fn run_floorplanner(
        &self,
        partition: &[usize],
        hypergraph: &Hypergraph,
        num_partitions: usize,
        _iterations: u32,
        _seed: u64,
    ) -> FloorplanResult {
        let mut areas = vec![0.0; num_partitions];
        let mut counts = vec![0usize; num_partitions];
        for (v, &p) in partition.iter().enumerate() {
            if p < num_partitions {
                areas[p] += hypergraph.vertex_weights.get(v).copied().unwrap_or(0.0);
                counts[p] += 1;
            }
        }
        if counts.iter().any(|&c| c == 0) {
            return FloorplanResult {
                aspect_ratios: vec![1.0; num_partitions],
                x_locations: vec![0.0; num_partitions],
                y_locations: vec![0.0; num_partitions],
                success: false,
            };
        }

        let mut x_locations = Vec::with_capacity(num_partitions);
        let mut y_locations = Vec::with_capacity(num_partitions);
        let mut cursor_x = 0.0;
        for &area in &areas {
            let side = area.max(0.0).sqrt();
            x_locations.push(cursor_x);
            y_locations.push(0.0);
            cursor_x += side;
        }
        FloorplanResult { aspect_ratios: vec![1.0; num_partitions], x_locations, y_locations, success: true }
    }
}

/// Deterministic greedy single sweep: for each partition, finds its
/// lowest-gain-by-cut boundary vertex (weakest external pull) and moves it
/// to the neighboring partition it's most connected to, provided that does
/// not exceed the neighbor's `upper` bound. One pass per `refine` call.
#[derive(Debug, Clone, Default)]
pub struct GreedyRefiner;

impl Refiner for GreedyRefiner {
    fn refine(&self, hypergraph: &Hypergraph, upper: &[f64], _lower: &[f64], partition: &mut [usize]) {
        let n = hypergraph.num_vertices();
        if partition.len() != n || upper.is_empty() {
            return;
        }
        let num_partitions = upper.len();
        let mut weight_in = vec![0.0; num_partitions];
        for (v, &p) in partition.iter().enumerate() {
            if p < num_partitions {
                weight_in[p] += hypergraph.vertex_weights.get(v).copied().unwrap_or(0.0);
            }
        }

        let mut neighbors: HashMap<usize, Vec<(usize, f64)>> = HashMap::new();
        for &(a, b, w) in &hypergraph.edges {
            neighbors.entry(a).or_default().push((b, w));
            neighbors.entry(b).or_default().push((a, w));
        }

        for from in 0..num_partitions {
            let mut best: Option<(usize, usize, f64)> = None;
            for v in 0..n {
                if partition[v] != from {
                    continue;
                }
                let Some(edges) = neighbors.get(&v) else { continue };
                let mut cut_by_partition: HashMap<usize, f64> = HashMap::new();
                for &(u, w) in edges {
                    let pu = partition[u];
                    if pu != from {
                        *cut_by_partition.entry(pu).or_insert(0.0) += w;
                    }
                }
                let Some((&to, &external_cut)) =
                    cut_by_partition.iter().max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                else {
                    continue;
                };
                let weight = hypergraph.vertex_weights.get(v).copied().unwrap_or(0.0);
                if weight_in[to] + weight > upper[to] {
                    continue;
                }
                match best {
                    Some((_, _, best_cut)) if best_cut <= external_cut => {}
                    _ => best = Some((v, to, external_cut)),
                }
            }
            if let Some((v, to, _)) = best {
                let weight = hypergraph.vertex_weights.get(v).copied().unwrap_or(0.0);
                weight_in[from] -= weight;
                weight_in[to] += weight;
                partition[v] = to;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_partition_hypergraph() -> Hypergraph {
        Hypergraph { vertex_weights: vec![1.0, 1.0, 1.0, 1.0], edges: vec![(0, 1, 1.0), (1, 2, 5.0), (2, 3, 1.0)] }
    }

    #[test]
    fn row_floorplanner_succeeds_when_every_partition_nonempty() {
        let hg = two_partition_hypergraph();
        let partition = vec![0, 0, 1, 1];
        let result = RowFloorplanner.run_floorplanner(&partition, &hg, 2, 0, 0);
        assert!(result.success);
        assert_eq!(result.x_locations.len(), 2);
        assert_eq!(result.x_locations[0], 0.0);
    }

    #[test]
    fn row_floorplanner_fails_on_empty_partition() {
        let hg = two_partition_hypergraph();
        let partition = vec![0, 0, 0, 0];
        let result = RowFloorplanner.run_floorplanner(&partition, &hg, 2, 0, 0);
        assert!(!result.success);
    }

    #[test]
    fn greedy_refiner_moves_at_most_one_vertex_per_partition() {
        let hg = two_partition_hypergraph();
        let mut partition = vec![0, 0, 1, 1];
        let upper = vec![10.0, 10.0];
        GreedyRefiner.refine(&hg, &upper, &[0.0, 0.0], &mut partition);
        assert_eq!(partition.len(), 4);
    }

    #[test]
    fn greedy_refiner_respects_upper_bound() {
        let hg = two_partition_hypergraph();
        let mut partition = vec![0, 0, 1, 1];
        let upper = vec![2.0, 2.0];
        GreedyRefiner.refine(&hg, &upper, &[0.0, 0.0], &mut partition);
        let weight0: f64 = partition.iter().filter(|&&p| p == 0).count() as f64;
        assert!(weight0 <= 2.0);
    }
}
