use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_ai::{run_canonical_ga, run_hybrid_ga, EvaluationContext, GaConfig, HybridGaConfig, Hypergraph, RowFloorplanner, TechPartitionOracle};
use sim_core::netlist::{Block, ConnectivityGraph};
use sim_core::{Assembly, Layer, TechNode, WaferProcess};
use sim_econ::Library;

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
    for tech in TechNode::ALL {
        let mut per_tech = layer.clone();
        per_tech.freeze().ok();
        layers_by_tech.insert(tech, per_tech);
    }

    Library { wafer_process: wafer, assembly_process: assembly, test_process: None, layers_by_tech, ios: BTreeMap::new() }
}

fn reference_blocks(n: usize) -> Vec<Block> {
    (0..n).map(|i| Block::new(format!("b{i}"), 1.0 + (i as f64 % 3.0), 0.2, TechNode::N7, false).unwrap()).collect()
}

struct BenchOracle {
    library: Library,
    blocks: Vec<Block>,
    connectivity: ConnectivityGraph,
}

impl TechPartitionOracle for BenchOracle {
    fn evaluate_tech_vector(&self, techs: &[TechNode]) -> (f64, Vec<usize>) {
        let k = techs.len().max(1);
        let partition: Vec<usize> = (0..self.blocks.len()).map(|i| i % k).collect();
        let aspect = vec![1.0; k];
        let xy = vec![(0.0, 0.0); k];
        let cost = sim_econ::evaluate(&partition, techs, &aspect, &xy, &self.blocks, &self.connectivity, &self.library, 1.0, 0.0);
        (cost, partition)
    }
}

fn bench_canonical_ga(c: &mut Criterion) {
    let blocks = reference_blocks(12);
    let names: Vec<String> = blocks.iter().map(|b| b.name.clone()).collect();
    let oracle = BenchOracle { library: reference_library(), connectivity: ConnectivityGraph::new(names), blocks };
    let cfg = GaConfig { population: 20, generations: 15, ..Default::default() };

    c.bench_function("canonical ga 12 blocks", |b| {
        b.iter(|| black_box(run_canonical_ga(&oracle, &cfg, 7)))
    });
}

fn bench_hybrid_ga(c: &mut Criterion) {
    let blocks = reference_blocks(12);
    let names: Vec<String> = blocks.iter().map(|b| b.name.clone()).collect();
    let library = reference_library();
    let connectivity = ConnectivityGraph::new(names);
    let hypergraph = Hypergraph { vertex_weights: blocks.iter().map(|b| b.area).collect(), edges: vec![] };
    let ctx = EvaluationContext { blocks: &blocks, connectivity: &connectivity, library: &library, hypergraph: &hypergraph };
    let floorplanner = RowFloorplanner;
    let refiner = sim_ai::GreedyRefiner;
    let cfg = HybridGaConfig { population: 20, generations: 15, ..Default::default() };

    c.bench_function("hybrid ga 12 blocks", |b| {
        b.iter(|| black_box(run_hybrid_ga(blocks.len(), &floorplanner, &refiner, &ctx, &cfg, 7)))
    });
}

criterion_group!(benches, bench_canonical_ga, bench_hybrid_ga);
criterion_main!(benches);
