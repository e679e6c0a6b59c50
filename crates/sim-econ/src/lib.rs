#![deny(warnings)]

//! Cost evaluator (C5): turns a partition assignment over a netlist into a
//! scalar design cost by materializing a [`sim_core::Chip`] tree (one child
//! per partition) and running its yield/cost rollup.

use sim_core::netlist::{Block, ConnectivityGraph, Matrix};
use sim_core::tech::{self, TechNode};
use sim_core::{Assembly, Chip, ChipSpec, CoreError, CoreResult, Io, Layer, TestProcess, WaferProcess};
use std::collections::BTreeMap;
use thiserror::Error;

/// Sentinel cost returned for an invalid candidate so a GA fitness oracle
/// never has to special-case failure; `f64::MAX` matches the original's
/// `std::numeric_limits<float>::max()` guard value.
pub const MAX_FINITE_COST: f64 = f64::MAX;

/// Errors raised while building or evaluating a candidate: every [`CoreError`]
/// from the underlying chip tree, plus the two failure kinds specific to the
/// evaluation pipeline itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EconError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("evaluator failure: {0}")]
    EvaluatorFailure(String),
}

pub type EconResult<T> = Result<T, EconError>;

/// The fixed process inputs a run evaluates candidates against: one wafer
/// process, one assembly process, an optional shared test process, a layer
/// record per tech node (the stackup a partition gets when assigned that
/// node), and the IO records referenced by name from the netlist.
pub struct Library {
    pub wafer_process: WaferProcess,
    pub assembly_process: Assembly,
    pub test_process: Option<TestProcess>,
    pub layers_by_tech: BTreeMap<TechNode, Layer>,
    pub ios: BTreeMap<String, Io>,
}

impl Library {
    fn layer_for(&self, tech: TechNode) -> CoreResult<Layer> {
        self.layers_by_tech
            .get(&tech)
            .cloned()
            .ok_or_else(|| CoreError::UnknownTechNode(tech.to_string()))
    }
}

fn num_partitions(partition_ids: &[usize]) -> usize {
    partition_ids.iter().copied().max().map(|m| m + 1).unwrap_or(0)
}

fn partition_vector(partition_ids: &[usize], n: usize) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); n];
    for (block_id, &p) in partition_ids.iter().enumerate() {
        buckets[p].push(block_id);
    }
    buckets
}

/// Sums scaled area per partition (block's own tech -> that partition's
/// assigned tech) and the grand total across partitions.
fn partition_areas(buckets: &[Vec<usize>], blocks: &[Block], tech_per_partition: &[TechNode]) -> CoreResult<Vec<f64>> {
    let mut areas = vec![0.0; buckets.len()];
    for (p, members) in buckets.iter().enumerate() {
        for &b in members {
            let block = &blocks[b];
            let factor = tech::area_scaling_factor(block.tech, tech_per_partition[p], block.is_memory)?;
            areas[p] += block.area * factor;
        }
    }
    Ok(areas)
}

fn partition_powers(buckets: &[Vec<usize>], blocks: &[Block], tech_per_partition: &[TechNode]) -> Vec<f64> {
    let mut powers = vec![0.0; buckets.len()];
    for (p, members) in buckets.iter().enumerate() {
        for &b in members {
            let block = &blocks[b];
            let factor = tech::power_scaling_factor(block.tech, tech_per_partition[p]);
            powers[p] += block.power * factor;
        }
    }
    powers
}

/// Folds the block-level connectivity graph down to one entry per partition
/// pair: adjacency counts sum, utilization is adjacency-weighted averaged
/// (so a partition-level connection's utilization still reflects how busy
/// the individual wires crossing it are).
fn combine_connectivity(
    graph: &ConnectivityGraph,
    partition_ids: &[usize],
    n: usize,
) -> CoreResult<ConnectivityGraph> {
    let names: Vec<String> = (0..n).map(|p| format!("partition_{p}")).collect();
    let mut combined = ConnectivityGraph::new(names);
    for io_type in graph.io_types().map(str::to_string).collect::<Vec<_>>() {
        let adj = graph.adjacency(&io_type).expect("io_type came from graph.io_types()");
        let util = graph.utilization(&io_type).expect("io_type came from graph.io_types()");
        let block_count = graph.block_count();

        let mut combined_adj = Matrix::<i32>::zeroed(n);
        let mut weighted_util = Matrix::<f64>::zeroed(n);
        for i in 0..block_count {
            for j in 0..block_count {
                let count = *adj.get(i, j);
                if count == 0 {
                    continue;
                }
                let (pi, pj) = (partition_ids[i], partition_ids[j]);
                let prev_count = *combined_adj.get(pi, pj);
                combined_adj.set(pi, pj, prev_count + count);
                let prev_weighted = *weighted_util.get(pi, pj);
                weighted_util.set(pi, pj, prev_weighted + count as f64 * util.get(i, j));
            }
        }
        let mut combined_util = Matrix::<f64>::zeroed(n);
        for pi in 0..n {
            for pj in 0..n {
                let count = *combined_adj.get(pi, pj);
                if count != 0 {
                    combined_util.set(pi, pj, *weighted_util.get(pi, pj) / count as f64);
                }
            }
        }
        combined.set_io_type(io_type, combined_adj, combined_util)?;
    }
    Ok(combined)
}

/// Builds and initializes the chip tree for one candidate partitioning: a
/// root chip with no area or process of its own, carrying the combined
/// connectivity graph, and one leaf child per partition with the summed,
/// tech-scaled area/power of its assigned blocks.
pub fn build_model(
    partition_ids: &[usize],
    tech_per_partition: &[TechNode],
    aspect_ratio_per_partition: &[f64],
    xy_per_partition: &[(f64, f64)],
    blocks: &[Block],
    connectivity: &ConnectivityGraph,
    library: &Library,
) -> EconResult<Chip> {
    if partition_ids.len() != blocks.len() {
        return Err(EconError::SizeMismatch { expected: blocks.len(), got: partition_ids.len() });
    }
    let n = num_partitions(partition_ids);
    if tech_per_partition.len() < n || aspect_ratio_per_partition.len() < n || xy_per_partition.len() < n {
        return Err(EconError::SizeMismatch {
            expected: n,
            got: tech_per_partition.len().min(aspect_ratio_per_partition.len()).min(xy_per_partition.len()),
        });
    }

    let buckets = partition_vector(partition_ids, n);
    let areas = partition_areas(&buckets, blocks, tech_per_partition)?;
    let powers = partition_powers(&buckets, blocks, tech_per_partition);
    let combined = combine_connectivity(connectivity, partition_ids, n)?;
    let partition_names: Vec<String> = (0..n).map(|p| format!("partition_{p}")).collect();

    let mut root = Chip::new(ChipSpec {
        name: "root".to_string(),
        core_area: 0.0,
        aspect_ratio: 1.0,
        x_location: 0.0,
        y_location: 0.0,
        bb_area: None,
        bb_cost: None,
        bb_quality: None,
        bb_power: None,
        fraction_memory: 0.0,
        fraction_logic: 0.0,
        fraction_analog: 0.0,
        gate_flop_ratio: 0.0,
        reticle_share: 0.0,
        buried: false,
        core_voltage: 1.0,
        power: 0.0,
        quantity: 1,
        assembly_process: Some(library.assembly_process.clone()),
        test_process: None,
        stackup: Vec::new(),
        wafer_process: None,
        block_names: partition_names.clone(),
        io_list: library.ios.values().cloned().collect(),
        connectivity: combined,
    })?;

    for p in 0..n {
        let (x, y) = xy_per_partition[p];
        let layer = library.layer_for(tech_per_partition[p])?;
        let child = Chip::new(ChipSpec {
            name: partition_names[p].clone(),
            core_area: areas[p],
            aspect_ratio: aspect_ratio_per_partition[p],
            x_location: x,
            y_location: y,
            bb_area: None,
            bb_cost: None,
            bb_quality: None,
            bb_power: None,
            fraction_memory: 0.0,
            fraction_logic: 1.0,
            fraction_analog: 0.0,
            gate_flop_ratio: 1.0,
            reticle_share: 1.0 / n as f64,
            buried: false,
            core_voltage: 1.0,
            power: powers[p],
            quantity: 1,
            assembly_process: None,
            test_process: library.test_process.clone(),
            stackup: vec![layer],
            wafer_process: Some(library.wafer_process.clone()),
            block_names: partition_names.clone(),
            io_list: library.ios.values().cloned().collect(),
            connectivity: ConnectivityGraph::new(partition_names.clone()),
        })?;
        root.add_child(child)?;
    }

    root.initialize()?;
    Ok(root)
}

/// `cost_coeff * chip.cost() + power_coeff * chip.total_power()` for the
/// candidate, or [`MAX_FINITE_COST`] if the candidate cannot be built or
/// initialized (unknown tech node, mismatched vector lengths, a yield of
/// zero anywhere in the tree).
pub fn evaluate(
    partition_ids: &[usize],
    tech_per_partition: &[TechNode],
    aspect_ratio_per_partition: &[f64],
    xy_per_partition: &[(f64, f64)],
    blocks: &[Block],
    connectivity: &ConnectivityGraph,
    library: &Library,
    cost_coeff: f64,
    power_coeff: f64,
) -> f64 {
    match build_model(
        partition_ids,
        tech_per_partition,
        aspect_ratio_per_partition,
        xy_per_partition,
        blocks,
        connectivity,
        library,
    ) {
        Ok(chip) => cost_coeff * chip.cost() + power_coeff * chip.total_power(),
        Err(err) => {
            tracing::warn!(error = %err, "candidate evaluation failed, reporting max finite cost");
            MAX_FINITE_COST
        }
    }
}

/// `delta[b][p] = evaluate(b moved to p) - evaluate(base)`, `0.0` on the
/// diagonal (`p == base_partition_ids[b]`).
pub fn evaluate_incremental(
    base_partition_ids: &[usize],
    tech_per_partition: &[TechNode],
    aspect_ratio_per_partition: &[f64],
    xy_per_partition: &[(f64, f64)],
    blocks: &[Block],
    connectivity: &ConnectivityGraph,
    library: &Library,
    cost_coeff: f64,
    power_coeff: f64,
) -> Vec<Vec<f64>> {
    let n = num_partitions(base_partition_ids);
    let base_cost = evaluate(
        base_partition_ids,
        tech_per_partition,
        aspect_ratio_per_partition,
        xy_per_partition,
        blocks,
        connectivity,
        library,
        cost_coeff,
        power_coeff,
    );

    (0..blocks.len())
        .map(|b| {
            (0..n)
                .map(|p| {
                    if base_partition_ids[b] == p {
                        return 0.0;
                    }
                    let mut moved = base_partition_ids.to_vec();
                    moved[b] = p;
                    let moved_cost = evaluate(
                        &moved,
                        tech_per_partition,
                        aspect_ratio_per_partition,
                        xy_per_partition,
                        blocks,
                        connectivity,
                        library,
                        cost_coeff,
                        power_coeff,
                    );
                    moved_cost - base_cost
                })
                .collect()
        })
        .collect()
}

/// Cost delta for moving a single block from `from` to `to`, relative to
/// `base`. Panics-free precondition: `base[block] == from`; callers that
/// violate it get `0.0` since the move described did not actually happen.
pub fn evaluate_single_move(
    base_partition_ids: &[usize],
    block: usize,
    from: usize,
    to: usize,
    tech_per_partition: &[TechNode],
    aspect_ratio_per_partition: &[f64],
    xy_per_partition: &[(f64, f64)],
    blocks: &[Block],
    connectivity: &ConnectivityGraph,
    library: &Library,
    cost_coeff: f64,
    power_coeff: f64,
) -> f64 {
    if base_partition_ids[block] != from {
        return 0.0;
    }
    let base_cost = evaluate(
        base_partition_ids,
        tech_per_partition,
        aspect_ratio_per_partition,
        xy_per_partition,
        blocks,
        connectivity,
        library,
        cost_coeff,
        power_coeff,
    );
    let mut moved = base_partition_ids.to_vec();
    moved[block] = to;
    let moved_cost = evaluate(
        &moved,
        tech_per_partition,
        aspect_ratio_per_partition,
        xy_per_partition,
        blocks,
        connectivity,
        library,
        cost_coeff,
        power_coeff,
    );
    moved_cost - base_cost
}

/// Numerical gradient estimates: for each block, the effect of growing its
/// area by 1%; for each partition, the effect of growing every incident
/// connection's utilization by 1%. Confidence intervals are a flat +-5% of
/// the base cost/power, matching the original's fixed-percentage estimate
/// rather than a propagated numerical error bound.
pub struct Slopes {
    pub cost_area_slopes: Vec<f64>,
    pub power_area_slopes: Vec<f64>,
    pub cost_bandwidth_slopes: Vec<f64>,
    pub power_bandwidth_slopes: Vec<f64>,
    pub cost_confidence_interval: f64,
    pub power_confidence_interval: f64,
    pub total_cost: f64,
}

const SLOPE_DELTA: f64 = 0.01;

fn chip_cost_power(
    partition_ids: &[usize],
    tech_per_partition: &[TechNode],
    aspect_ratio_per_partition: &[f64],
    xy_per_partition: &[(f64, f64)],
    blocks: &[Block],
    connectivity: &ConnectivityGraph,
    library: &Library,
) -> EconResult<(f64, f64)> {
    let chip = build_model(
        partition_ids,
        tech_per_partition,
        aspect_ratio_per_partition,
        xy_per_partition,
        blocks,
        connectivity,
        library,
    )?;
    Ok((chip.cost(), chip.total_power()))
}

fn bump_utilization_incident_to(graph: &ConnectivityGraph, partition_ids: &[usize], partition: usize, delta: f64) -> CoreResult<ConnectivityGraph> {
    let n = graph.block_count();
    let mut bumped = ConnectivityGraph::new(graph.block_names().to_vec());
    for io_type in graph.io_types().map(str::to_string).collect::<Vec<_>>() {
        let adj = graph.adjacency(&io_type).expect("io_type came from graph.io_types()").clone();
        let util = graph.utilization(&io_type).expect("io_type came from graph.io_types()");
        let mut bumped_util = util.clone();
        for i in 0..n {
            for j in 0..n {
                if partition_ids[i] == partition || partition_ids[j] == partition {
                    let v = *util.get(i, j);
                    bumped_util.set(i, j, v * (1.0 + delta));
                }
            }
        }
        bumped.set_io_type(io_type, adj, bumped_util)?;
    }
    Ok(bumped)
}

pub fn slopes(
    partition_ids: &[usize],
    tech_per_partition: &[TechNode],
    aspect_ratio_per_partition: &[f64],
    xy_per_partition: &[(f64, f64)],
    blocks: &[Block],
    connectivity: &ConnectivityGraph,
    library: &Library,
    cost_coeff: f64,
    power_coeff: f64,
) -> EconResult<Slopes> {
    let (base_cost, base_power) = chip_cost_power(
        partition_ids,
        tech_per_partition,
        aspect_ratio_per_partition,
        xy_per_partition,
        blocks,
        connectivity,
        library,
    )?;
    let base_total = cost_coeff * base_cost + power_coeff * base_power;

    let mut cost_area_slopes = vec![0.0; blocks.len()];
    let mut power_area_slopes = vec![0.0; blocks.len()];
    for (i, block) in blocks.iter().enumerate() {
        if block.area == 0.0 {
            continue;
        }
        let mut bumped_blocks = blocks.to_vec();
        bumped_blocks[i].area *= 1.0 + SLOPE_DELTA;
        let (cost, power) = chip_cost_power(
            partition_ids,
            tech_per_partition,
            aspect_ratio_per_partition,
            xy_per_partition,
            &bumped_blocks,
            connectivity,
            library,
        )?;
        cost_area_slopes[i] = (cost - base_cost) / (SLOPE_DELTA * block.area);
        power_area_slopes[i] = (power - base_power) / (SLOPE_DELTA * block.area);
    }

    let n = num_partitions(partition_ids);
    let mut cost_bandwidth_slopes = vec![0.0; blocks.len()];
    let mut power_bandwidth_slopes = vec![0.0; blocks.len()];
    for p in 0..n {
        let bumped_connectivity = bump_utilization_incident_to(connectivity, partition_ids, p, SLOPE_DELTA)?;
        let (cost, power) = chip_cost_power(
            partition_ids,
            tech_per_partition,
            aspect_ratio_per_partition,
            xy_per_partition,
            blocks,
            &bumped_connectivity,
            library,
        )?;
        let cost_slope = (cost - base_cost) / SLOPE_DELTA;
        let power_slope = (power - base_power) / SLOPE_DELTA;
        for (b, &bp) in partition_ids.iter().enumerate() {
            if bp == p {
                cost_bandwidth_slopes[b] = cost_slope;
                power_bandwidth_slopes[b] = power_slope;
            }
        }
    }

    Ok(Slopes {
        cost_area_slopes,
        power_area_slopes,
        cost_bandwidth_slopes,
        power_bandwidth_slopes,
        cost_confidence_interval: 0.05 * base_cost,
        power_confidence_interval: 0.05 * base_power,
        total_cost: base_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::netlist::Block;

    fn reference_library() -> Library {
        let mut wafer = WaferProcess::new();
        wafer.set_wafer_diameter(300.0).unwrap();
        wafer.set_edge_exclusion(3.0).unwrap();
        wafer.set_wafer_process_yield(0.95).unwrap();
        wafer.set_dicing_distance(0.1).unwrap();
        wafer.set_reticle_x(26.0).unwrap();
        wafer.set_reticle_y(33.0).unwrap();
        wafer.set_grid_fill(false).unwrap();
        wafer.set_nre_front_end_cost_per_mm2_memory(0.0).unwrap();
        wafer.set_nre_front_end_cost_per_mm2_logic(0.0).unwrap();
        wafer.set_nre_front_end_cost_per_mm2_analog(0.0).unwrap();
        wafer.set_nre_back_end_cost_per_mm2_memory(0.0).unwrap();
        wafer.set_nre_back_end_cost_per_mm2_logic(0.0).unwrap();
        wafer.set_nre_back_end_cost_per_mm2_analog(0.0).unwrap();
        wafer.freeze().unwrap();

        let mut assembly = Assembly::new();
        assembly.set_materials_cost_per_mm2(0.01).unwrap();
        assembly.set_bb_cost_per_second(0.001).unwrap();
        assembly.set_picknplace_machine_cost(100_000.0).unwrap();
        assembly.set_picknplace_machine_lifetime(5.0).unwrap();
        assembly.set_picknplace_machine_uptime(0.9).unwrap();
        assembly.set_picknplace_technician_yearly_cost(80_000.0).unwrap();
        assembly.set_picknplace_time(1.0).unwrap();
        assembly.set_picknplace_group(1.0).unwrap();
        assembly.set_bonding_machine_cost(200_000.0).unwrap();
        assembly.set_bonding_machine_lifetime(5.0).unwrap();
        assembly.set_bonding_machine_uptime(0.9).unwrap();
        assembly.set_bonding_technician_yearly_cost(80_000.0).unwrap();
        assembly.set_bonding_time(1.0).unwrap();
        assembly.set_bonding_group(1.0).unwrap();
        assembly.set_die_separation(0.1).unwrap();
        assembly.set_edge_exclusion(0.2).unwrap();
        assembly.set_max_pad_current_density(0.01).unwrap();
        assembly.set_bonding_pitch(0.1).unwrap();
        assembly.set_alignment_yield(0.99).unwrap();
        assembly.set_bonding_yield(0.99).unwrap();
        assembly.set_dielectric_bond_defect_density(0.0).unwrap();
        assembly.freeze().unwrap();

        let mut layer = Layer::new();
        layer.set_name("logic_7nm").unwrap();
        layer.set_active(true).unwrap();
        layer.set_cost_per_mm2(0.05).unwrap();
        layer.set_transistor_density(100.0).unwrap();
        layer.set_defect_density(0.001).unwrap();
        layer.set_critical_area_ratio(0.5).unwrap();
        layer.set_clustering_factor(2.0).unwrap();
        layer.set_litho_percent(0.3).unwrap();
        layer.set_mask_cost(1_000_000.0).unwrap();
        layer.set_stitching_yield(0.99).unwrap();
        layer.freeze().unwrap();

        let mut layers_by_tech = BTreeMap::new();
        layers_by_tech.insert(TechNode::N7, layer);

        Library { wafer_process: wafer, assembly_process: assembly, test_process: None, layers_by_tech, ios: BTreeMap::new() }
    }

    fn reference_blocks() -> Vec<Block> {
        vec![
            Block::new("b0", 1.0, 0.5, TechNode::N7, false).unwrap(),
            Block::new("b1", 2.0, 0.8, TechNode::N7, false).unwrap(),
        ]
    }

    #[test]
    fn evaluate_single_partition_matches_build_model() {
        let library = reference_library();
        let blocks = reference_blocks();
        let connectivity = ConnectivityGraph::new(vec!["b0".into(), "b1".into()]);
        let partition_ids = [0usize, 0usize];
        let tech = [TechNode::N7];
        let aspect = [1.0];
        let xy = [(0.0, 0.0)];

        let cost = evaluate(&partition_ids, &tech, &aspect, &xy, &blocks, &connectivity, &library, 1.0, 0.0);
        assert!(cost.is_finite());
        assert!(cost > 0.0);
    }

    #[test]
    fn evaluate_unknown_tech_node_is_max_finite_cost() {
        let library = Library { layers_by_tech: BTreeMap::new(), ..reference_library() };
        let blocks = reference_blocks();
        let connectivity = ConnectivityGraph::new(vec!["b0".into(), "b1".into()]);
        let partition_ids = [0usize, 0usize];
        let tech = [TechNode::N7];
        let aspect = [1.0];
        let xy = [(0.0, 0.0)];

        let cost = evaluate(&partition_ids, &tech, &aspect, &xy, &blocks, &connectivity, &library, 1.0, 0.0);
        assert_eq!(cost, MAX_FINITE_COST);
    }

    #[test]
    fn evaluate_incremental_is_zero_on_diagonal() {
        let library = reference_library();
        let mut layers_by_tech = library.layers_by_tech.clone();
        layers_by_tech.insert(TechNode::N7, layers_by_tech[&TechNode::N7].clone());
        let blocks = reference_blocks();
        let mut connectivity = ConnectivityGraph::new(vec!["b0".into(), "b1".into()]);
        let mut adj = Matrix::<i32>::zeroed(2);
        adj.set(0, 1, 1);
        connectivity.set_io_type("d2d", adj, Matrix::<f64>::zeroed(2)).unwrap();

        let partition_ids = [0usize, 1usize];
        let tech = [TechNode::N7, TechNode::N7];
        let aspect = [1.0, 1.0];
        let xy = [(0.0, 0.0), (1.0, 0.0)];

        let deltas = evaluate_incremental(&partition_ids, &tech, &aspect, &xy, &blocks, &connectivity, &library, 1.0, 0.0);
        assert_eq!(deltas[0][0], 0.0);
        assert_eq!(deltas[1][1], 0.0);
    }

    #[test]
    fn partition_relabeling_preserves_cost() {
        let mut library = reference_library();
        let n7_layer = library.layers_by_tech[&TechNode::N7].clone();
        library.layers_by_tech.insert(TechNode::N14, n7_layer);
        let blocks = reference_blocks();
        let connectivity = ConnectivityGraph::new(vec!["b0".into(), "b1".into()]);

        let partition_ids = [0usize, 1usize];
        let tech = [TechNode::N7, TechNode::N14];
        let aspect = [1.0, 1.2];
        let xy = [(0.0, 0.0), (1.0, 0.0)];
        let cost = evaluate(&partition_ids, &tech, &aspect, &xy, &blocks, &connectivity, &library, 1.0, 0.0);

        // Swapping partition labels 0 and 1 everywhere (ids, tech, aspect, xy
        // all co-indexed by partition) must not change the scalar cost: the
        // evaluator has no notion of "partition 0" beyond array position.
        let relabeled_ids = [1usize, 0usize];
        let relabeled_tech = [tech[1], tech[0]];
        let relabeled_aspect = [aspect[1], aspect[0]];
        let relabeled_xy = [xy[1], xy[0]];
        let relabeled_cost =
            evaluate(&relabeled_ids, &relabeled_tech, &relabeled_aspect, &relabeled_xy, &blocks, &connectivity, &library, 1.0, 0.0);

        assert!((cost - relabeled_cost).abs() < 1e-6);
    }

    #[test]
    fn slopes_reports_finite_confidence_intervals() {
        let library = reference_library();
        let blocks = reference_blocks();
        let connectivity = ConnectivityGraph::new(vec!["b0".into(), "b1".into()]);
        let partition_ids = [0usize, 0usize];
        let tech = [TechNode::N7];
        let aspect = [1.0];
        let xy = [(0.0, 0.0)];

        let s = slopes(&partition_ids, &tech, &aspect, &xy, &blocks, &connectivity, &library, 1.0, 0.0).unwrap();
        assert_eq!(s.cost_area_slopes.len(), 2);
        assert!(s.cost_confidence_interval.is_finite());
        assert!(s.power_confidence_interval.is_finite());
    }
}
