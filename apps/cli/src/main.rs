#![deny(warnings)]

//! Hand-rolled CLI: loads a process library, netlist and blocks, runs the
//! selected co-optimizer to completion, and writes the per-run output files.

use anyhow::{Context, Result};
use sim_ai::{
    run_canonical_ga, run_hybrid_ga, EvaluationContext, GaConfig, GreedyRefiner, HybridGaConfig,
    Hypergraph, RowFloorplanner, TechPartitionOracle,
};
use sim_core::netlist::{Block, ConnectivityGraph};
use sim_core::TechNode;
use sim_econ::{Library, MAX_FINITE_COST};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy)]
enum Mode {
    Canonical,
    Hybrid,
}

struct Args {
    library_dir: String,
    blocks: String,
    netlist: String,
    mode: Mode,
    out: String,
    config: Option<String>,
    seed: u64,
}

fn print_usage() {
    eprintln!(
        "usage: cli --library-dir <dir> --blocks <file> --netlist <file> --mode canonical|hybrid --out <prefix> [--config <yaml>] [--seed <u64>]"
    );
}

fn parse_args() -> Option<Args> {
    let mut library_dir = None;
    let mut blocks = None;
    let mut netlist = None;
    let mut mode = None;
    let mut out = None;
    let mut config = None;
    let mut seed = 42u64;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--library-dir" => library_dir = it.next(),
            "--blocks" => blocks = it.next(),
            "--netlist" => netlist = it.next(),
            "--mode" => {
                mode = match it.next().as_deref() {
                    Some("canonical") => Some(Mode::Canonical),
                    Some("hybrid") => Some(Mode::Hybrid),
                    _ => None,
                }
            }
            "--out" => out = it.next(),
            "--config" => config = it.next(),
            "--seed" => seed = it.next().and_then(|s| s.parse().ok())?,
            _ => return None,
        }
    }

    Some(Args {
        library_dir: library_dir?,
        blocks: blocks?,
        netlist: netlist?,
        mode: mode?,
        out: out?,
        config,
        seed,
    })
}

/// GA parameters and evaluator coefficients, unified across both search
/// modes with a `Default` harmonized from each mode's own defaults.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
struct RunConfig {
    population: usize,
    generations: usize,
    crossover_rate: f64,
    mutation_rate: f64,
    tournament_size: usize,
    elite_count: usize,
    min_partitions: usize,
    max_partitions: usize,
    early_stop_window: usize,
    early_stop_threshold: f64,
    balance_factor: f64,
    floorplan_iterations: u32,
    cost_coeff: f64,
    power_coeff: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        let ga = GaConfig::default();
        let hybrid = HybridGaConfig::default();
        Self {
            population: ga.population,
            generations: ga.generations,
            crossover_rate: ga.crossover_rate,
            mutation_rate: ga.mutation_rate,
            tournament_size: ga.tournament_size,
            elite_count: ga.elite_count,
            min_partitions: ga.min_partitions,
            max_partitions: ga.max_partitions,
            early_stop_window: ga.early_stop_window,
            early_stop_threshold: ga.early_stop_threshold,
            balance_factor: hybrid.balance_factor,
            floorplan_iterations: hybrid.floorplan_iterations,
            cost_coeff: hybrid.cost_coeff,
            power_coeff: hybrid.power_coeff,
        }
    }
}

impl RunConfig {
    fn to_ga_config(&self) -> GaConfig {
        GaConfig {
            population: self.population,
            generations: self.generations,
            crossover_rate: self.crossover_rate,
            mutation_rate: self.mutation_rate,
            tournament_size: self.tournament_size,
            elite_count: self.elite_count,
            min_partitions: self.min_partitions,
            max_partitions: self.max_partitions,
            early_stop_window: self.early_stop_window,
            early_stop_threshold: self.early_stop_threshold,
        }
    }

    fn to_hybrid_config(&self) -> HybridGaConfig {
        HybridGaConfig {
            population: self.population,
            generations: self.generations,
            crossover_rate: self.crossover_rate,
            mutation_rate: self.mutation_rate,
            tournament_size: self.tournament_size,
            min_partitions: self.min_partitions,
            max_partitions: self.max_partitions,
            balance_factor: self.balance_factor,
            floorplan_iterations: self.floorplan_iterations,
            cost_coeff: self.cost_coeff,
            power_coeff: self.power_coeff,
        }
    }
}

fn load_run_config(path: Option<&str>) -> Result<RunConfig> {
    match path {
        None => Ok(RunConfig::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
            let cfg = serde_yaml::from_str(&text).with_context(|| format!("parsing config file {path}"))?;
            Ok(cfg)
        }
    }
}

/// Bridges the netlist's per-IO-type adjacency/utilization matrices into the
/// single weighted-edge view the floorplanner/refiner collaborators need:
/// edge weight is connection count scaled by (1 + combined utilization).
fn build_hypergraph(blocks: &[Block], connectivity: &ConnectivityGraph) -> Hypergraph {
    let n = blocks.len();
    let vertex_weights = blocks.iter().map(|b| b.area).collect();
    let mut edges = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let mut weight = 0.0;
            for io_type in connectivity.io_types() {
                let (Some(adj), Some(util)) = (connectivity.adjacency(io_type), connectivity.utilization(io_type)) else {
                    continue;
                };
                let count = (*adj.get(i, j) + *adj.get(j, i)) as f64;
                if count > 0.0 {
                    let util_sum = (*util.get(i, j) + *util.get(j, i)).max(0.0);
                    weight += count * (1.0 + util_sum);
                }
            }
            if weight > 0.0 {
                edges.push((i, j, weight));
            }
        }
    }
    Hypergraph { vertex_weights, edges }
}

/// Oracle for the canonical GA: round-robins blocks across the tech
/// vector's partition count, runs a few greedy-refiner passes to balance
/// it, then scores the result with the cost evaluator.
struct CliOracle<'a> {
    blocks: &'a [Block],
    connectivity: &'a ConnectivityGraph,
    library: &'a Library,
    hypergraph: &'a Hypergraph,
    refine_passes: u32,
    cost_coeff: f64,
    power_coeff: f64,
}

impl TechPartitionOracle for CliOracle<'_> {
    fn evaluate_tech_vector(&self, techs: &[TechNode]) -> (f64, Vec<usize>) {
        let k = techs.len().max(1);
        let n = self.blocks.len();
        let mut partition: Vec<usize> = (0..n).map(|i| i % k).collect();

        let total_weight: f64 = self.hypergraph.vertex_weights.iter().sum();
        let upper = vec![total_weight / k as f64 * 1.5; k];
        let lower = vec![0.0; k];
        let refiner = GreedyRefiner;
        for _ in 0..self.refine_passes {
            refiner.refine(self.hypergraph, &upper, &lower, &mut partition);
        }

        let aspect = vec![1.0; k];
        let xy = vec![(0.0, 0.0); k];
        let cost = sim_econ::evaluate(
            &partition,
            techs,
            &aspect,
            &xy,
            self.blocks,
            self.connectivity,
            self.library,
            self.cost_coeff,
            self.power_coeff,
        );
        (cost, partition)
    }
}

fn run(args: &Args) -> Result<String> {
    let run_config = load_run_config(args.config.as_deref())?;
    let library = persistence::load_library(&args.library_dir)?;
    let (blocks, connectivity) = persistence::load_netlist_inputs(&args.blocks, &args.netlist)?;
    let hypergraph = build_hypergraph(&blocks, &connectivity);

    let (partition, tech_vector, cost, valid) = match args.mode {
        Mode::Canonical => {
            let oracle = CliOracle {
                blocks: &blocks,
                connectivity: &connectivity,
                library: &library,
                hypergraph: &hypergraph,
                refine_passes: 3,
                cost_coeff: run_config.cost_coeff,
                power_coeff: run_config.power_coeff,
            };
            let cfg = run_config.to_ga_config();
            let outcome = run_canonical_ga(&oracle, &cfg, args.seed);
            info!(generations = outcome.generations_run, cost = outcome.best_cost, "canonical GA finished");
            let valid = outcome.best_cost < MAX_FINITE_COST;
            (outcome.best_partition, outcome.best_tech_vector, outcome.best_cost, valid)
        }
        Mode::Hybrid => {
            let floorplanner = RowFloorplanner;
            let refiner = GreedyRefiner;
            let ctx = EvaluationContext { blocks: &blocks, connectivity: &connectivity, library: &library, hypergraph: &hypergraph };
            let cfg = run_config.to_hybrid_config();
            let outcome = run_hybrid_ga(blocks.len(), &floorplanner, &refiner, &ctx, &cfg, args.seed);
            info!(generations = outcome.generations_run, cost = outcome.best_candidate.cost, "hybrid GA finished");
            (outcome.best_candidate.partition, outcome.best_candidate.tech_vector, outcome.best_candidate.cost, outcome.best_candidate.valid)
        }
    };

    persistence::write::write_outputs(&args.out, &partition, &tech_vector, cost, valid).context("writing output files")
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(args) = parse_args() else {
        print_usage();
        std::process::exit(1);
    };

    match run(&args) {
        Ok(summary) => {
            print!("{summary}");
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}
