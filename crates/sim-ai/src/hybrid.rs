//! Hybrid GA (C7): searches jointly over a partition assignment and a
//! tech-node vector. Each candidate's fitness composes a [`Floorplanner`]
//! pass, one [`Refiner`] pass under balance constraints, and the cost
//! evaluator, so the search operates directly on the partitioning rather
//! than delegating it to an external oracle as the canonical GA does.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use sim_core::netlist::{Block, ConnectivityGraph};
use sim_core::tech::TechNode;
use sim_econ::{Library, MAX_FINITE_COST};

use crate::collaborators::{Floorplanner, Hypergraph, Refiner};

#[derive(Debug, Clone)]
pub struct HybridGaConfig {
    pub population: usize,
    pub generations: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    pub min_partitions: usize,
    pub max_partitions: usize,
    /// Per-partition balance bound as a multiple of the even split:
    /// `upper[p] = total_weight * balance_factor / num_partitions`.
    pub balance_factor: f64,
    pub floorplan_iterations: u32,
    pub cost_coeff: f64,
    pub power_coeff: f64,
}

impl Default for HybridGaConfig {
    fn default() -> Self {
        Self {
            population: 50,
            generations: 250,
            crossover_rate: 0.9,
            mutation_rate: 0.08,
            tournament_size: 3,
            min_partitions: 2,
            max_partitions: 8,
            balance_factor: 1.0,
            floorplan_iterations: 1,
            cost_coeff: 1.0,
            power_coeff: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HybridCandidate {
    pub partition: Vec<usize>,
    pub tech_vector: Vec<TechNode>,
    pub cost: f64,
    pub valid: bool,
}

impl HybridCandidate {
    fn new(partition: Vec<usize>, tech_vector: Vec<TechNode>) -> Self {
        Self { partition, tech_vector, cost: MAX_FINITE_COST, valid: false }
    }
}

fn random_tech(rng: &mut impl Rng) -> TechNode {
    *TechNode::ALL.choose(rng).expect("TechNode::ALL is non-empty")
}

fn remap_dense(partition: &mut [usize]) {
    let mut seen: BTreeMap<usize, usize> = BTreeMap::new();
    for &p in partition.iter() {
        let next = seen.len();
        seen.entry(p).or_insert(next);
    }
    for p in partition.iter_mut() {
        *p = seen[p];
    }
}

fn num_partitions_of(partition: &[usize]) -> usize {
    partition.iter().copied().max().map(|m| m + 1).unwrap_or(0)
}

/// Enforces the invariants a candidate must hold before it can be evaluated:
/// partition length matches the vertex count, partition ids are dense
/// (`0..k-1`), `tech_vector.len() == k`, and `k` is clamped into
/// `[min_partitions, max_partitions]`.
pub fn repair_candidate(candidate: &mut HybridCandidate, num_vertices: usize, cfg: &HybridGaConfig, rng: &mut impl Rng) {
    if candidate.partition.len() < num_vertices {
        let fallback = candidate.partition.iter().copied().max().unwrap_or(0);
        candidate.partition.resize(num_vertices, fallback);
    } else if candidate.partition.len() > num_vertices {
        candidate.partition.truncate(num_vertices);
    }
    remap_dense(&mut candidate.partition);

    let mut k = num_partitions_of(&candidate.partition).max(1);

    if k < cfg.min_partitions {
        let members: Vec<usize> =
            candidate.partition.iter().enumerate().filter(|&(_, &p)| p == 0).map(|(i, _)| i).collect();
        let mut next_id = k;
        let mut idx = 0;
        while next_id < cfg.min_partitions && idx < members.len() {
            let end = (idx + 5).min(members.len());
            for &v in &members[idx..end] {
                candidate.partition[v] = next_id;
            }
            next_id += 1;
            idx = end;
        }
        k = num_partitions_of(&candidate.partition).max(1);
    } else if k > cfg.max_partitions {
        for p in candidate.partition.iter_mut() {
            if *p >= cfg.max_partitions {
                *p = 0;
            }
        }
        remap_dense(&mut candidate.partition);
        k = num_partitions_of(&candidate.partition).max(1);
    }

    if candidate.tech_vector.len() < k {
        while candidate.tech_vector.len() < k {
            candidate.tech_vector.push(random_tech(rng));
        }
    } else if candidate.tech_vector.len() > k {
        candidate.tech_vector.truncate(k);
    }

    candidate.cost = MAX_FINITE_COST;
    candidate.valid = false;
}

fn fit_len(v: &[f64], n: usize, default: f64) -> Vec<f64> {
    let mut out = v.to_vec();
    out.resize(n, default);
    out.truncate(n);
    out
}

pub struct EvaluationContext<'a> {
    pub blocks: &'a [Block],
    pub connectivity: &'a ConnectivityGraph,
    pub library: &'a Library,
    pub hypergraph: &'a Hypergraph,
}

/// Runs the floorplanner, a balance-constrained refiner pass, and the cost
/// evaluator over one candidate. Every failure mode (floorplanner failure,
/// a degenerate partition count) is caught and mapped to
/// `(cost = MAX_FINITE_COST, valid = false)` per the propagation policy:
/// such candidates are never selected as the generation's best.
pub fn evaluate_hybrid_candidate(
    candidate: &mut HybridCandidate,
    floorplanner: &dyn Floorplanner,
    refiner: &dyn Refiner,
    ctx: &EvaluationContext,
    cfg: &HybridGaConfig,
    seed: u64,
) {
    match try_evaluate(candidate, floorplanner, refiner, ctx, cfg, seed) {
        Ok(cost) => {
            candidate.valid = cost < MAX_FINITE_COST;
            candidate.cost = cost;
        }
        Err(err) => {
            tracing::warn!(error = %err, "hybrid GA candidate evaluation failed, marking invalid");
            candidate.valid = false;
            candidate.cost = MAX_FINITE_COST;
        }
    }
}

fn try_evaluate(
    candidate: &mut HybridCandidate,
    floorplanner: &dyn Floorplanner,
    refiner: &dyn Refiner,
    ctx: &EvaluationContext,
    cfg: &HybridGaConfig,
    seed: u64,
) -> crate::error::AiResult<f64> {
    use crate::error::AiError;

    let num_partitions = num_partitions_of(&candidate.partition);
    if num_partitions == 0 || candidate.tech_vector.len() < num_partitions {
        return Err(AiError::DegeneratePartition { num_partitions, tech_vector_len: candidate.tech_vector.len() });
    }

    let floorplan = floorplanner.run_floorplanner(&candidate.partition, ctx.hypergraph, num_partitions, cfg.floorplan_iterations, seed);
    if !floorplan.success {
        return Err(AiError::FloorplannerFailed { num_partitions });
    }

    let total_weight: f64 = ctx.hypergraph.vertex_weights.iter().sum();
    let upper = vec![total_weight * cfg.balance_factor / num_partitions as f64; num_partitions];
    let lower = vec![0.0; num_partitions];
    refiner.refine(ctx.hypergraph, &upper, &lower, &mut candidate.partition);

    let recomputed = num_partitions_of(&candidate.partition);
    if recomputed == 0 || candidate.tech_vector.len() < recomputed {
        return Err(AiError::DegeneratePartition { num_partitions: recomputed, tech_vector_len: candidate.tech_vector.len() });
    }

    let aspect = fit_len(&floorplan.aspect_ratios, recomputed, 1.0);
    let xs = fit_len(&floorplan.x_locations, recomputed, 0.0);
    let ys = fit_len(&floorplan.y_locations, recomputed, 0.0);
    let xy: Vec<(f64, f64)> = xs.into_iter().zip(ys).collect();

    Ok(sim_econ::evaluate(
        &candidate.partition,
        &candidate.tech_vector[..recomputed],
        &aspect,
        &xy,
        ctx.blocks,
        ctx.connectivity,
        ctx.library,
        cfg.cost_coeff,
        cfg.power_coeff,
    ))
}

fn seed_population(num_vertices: usize, cfg: &HybridGaConfig, rng: &mut impl Rng) -> Vec<HybridCandidate> {
    let mut population = Vec::with_capacity(cfg.population);
    let k_values: Vec<usize> = (cfg.min_partitions.max(1)..=cfg.max_partitions.max(cfg.min_partitions.max(1))).collect();

    for &k in &k_values {
        if population.len() >= cfg.population {
            break;
        }
        let partition: Vec<usize> = (0..num_vertices).map(|v| v % k).collect();
        let tech_vector = (0..k).map(|_| random_tech(rng)).collect();
        population.push(HybridCandidate::new(partition, tech_vector));
    }

    while population.len() < cfg.population {
        let k = *k_values.choose(rng).unwrap_or(&1);
        let partition: Vec<usize> = (0..num_vertices).map(|_| rng.gen_range(0..k)).collect();
        let tech_vector = (0..k).map(|_| random_tech(rng)).collect();
        population.push(HybridCandidate::new(partition, tech_vector));
    }
    population
}

#[derive(Clone, Copy)]
enum CrossoverKind {
    PartitionOnePoint,
    TechUniform,
    Hybrid,
}

#[derive(Clone, Copy)]
enum MutationKind {
    PartitionPoint,
    TechPoint,
    Structure,
}

fn crossover_partition_one_point(a: &HybridCandidate, b: &HybridCandidate, rng: &mut impl Rng) -> HybridCandidate {
    let bound = a.partition.len().min(b.partition.len());
    let k = if bound == 0 { 0 } else { rng.gen_range(0..=bound) };
    let mut partition = a.partition[..k].to_vec();
    partition.extend_from_slice(&b.partition[k..]);
    let tech_vector = if a.cost <= b.cost { a.tech_vector.clone() } else { b.tech_vector.clone() };
    HybridCandidate::new(partition, tech_vector)
}

fn crossover_tech_uniform(a: &HybridCandidate, b: &HybridCandidate, rng: &mut impl Rng) -> HybridCandidate {
    let len = if rng.gen::<bool>() { a.tech_vector.len() } else { b.tech_vector.len() };
    let tech_vector = (0..len)
        .map(|i| {
            if rng.gen::<bool>() {
                a.tech_vector.get(i).or_else(|| b.tech_vector.get(i)).copied().unwrap_or_else(|| random_tech(rng))
            } else {
                b.tech_vector.get(i).or_else(|| a.tech_vector.get(i)).copied().unwrap_or_else(|| random_tech(rng))
            }
        })
        .collect();
    let partition = if a.cost <= b.cost { a.partition.clone() } else { b.partition.clone() };
    HybridCandidate::new(partition, tech_vector)
}

/// Unlike the other two operators, doesn't splice or pick an existing
/// parent's structure: the partition is a fresh random assignment sized to
/// one parent's cardinality, and the tech vector is a per-position coin flip
/// indexing cyclically into the shorter parent's length.
fn crossover_hybrid(a: &HybridCandidate, b: &HybridCandidate, rng: &mut impl Rng) -> HybridCandidate {
    let source = if rng.gen::<bool>() { a } else { b };
    let k = num_partitions_of(&source.partition).max(1);
    let partition: Vec<usize> = (0..source.partition.len()).map(|_| rng.gen_range(0..k)).collect();

    let min_tech_len = a.tech_vector.len().min(b.tech_vector.len());
    let tech_len = if rng.gen::<bool>() { a.tech_vector.len() } else { b.tech_vector.len() };
    let tech_vector: Vec<TechNode> = (0..tech_len)
        .map(|i| {
            if min_tech_len == 0 {
                random_tech(rng)
            } else if rng.gen::<bool>() {
                a.tech_vector[i % min_tech_len]
            } else {
                b.tech_vector[i % min_tech_len]
            }
        })
        .collect();

    HybridCandidate::new(partition, tech_vector)
}

fn crossover(a: &HybridCandidate, b: &HybridCandidate, rng: &mut impl Rng) -> HybridCandidate {
    match *[CrossoverKind::PartitionOnePoint, CrossoverKind::TechUniform, CrossoverKind::Hybrid]
        .choose(rng)
        .expect("non-empty")
    {
        CrossoverKind::PartitionOnePoint => crossover_partition_one_point(a, b, rng),
        CrossoverKind::TechUniform => crossover_tech_uniform(a, b, rng),
        CrossoverKind::Hybrid => crossover_hybrid(a, b, rng),
    }
}

fn mutate(candidate: &mut HybridCandidate, cfg: &HybridGaConfig, rng: &mut impl Rng) {
    if candidate.partition.is_empty() {
        return;
    }
    let k = num_partitions_of(&candidate.partition).max(1);
    match *[MutationKind::PartitionPoint, MutationKind::TechPoint, MutationKind::Structure].choose(rng).expect("non-empty") {
        MutationKind::PartitionPoint => {
            let moves = ((candidate.partition.len() as f64) * 0.05).ceil() as usize;
            for _ in 0..moves.max(1) {
                let v = rng.gen_range(0..candidate.partition.len());
                candidate.partition[v] = rng.gen_range(0..k);
            }
        }
        MutationKind::TechPoint => {
            let replacements = ((candidate.tech_vector.len() as f64) / 3.0).ceil() as usize;
            for _ in 0..replacements.max(1) {
                if candidate.tech_vector.is_empty() {
                    break;
                }
                let i = rng.gen_range(0..candidate.tech_vector.len());
                candidate.tech_vector[i] = random_tech(rng);
            }
        }
        MutationKind::Structure => {
            if rng.gen::<bool>() && k < cfg.max_partitions {
                // split: move half of partition 0's members into a new partition
                let members: Vec<usize> =
                    candidate.partition.iter().enumerate().filter(|&(_, &p)| p == 0).map(|(i, _)| i).collect();
                for &v in members.iter().take(members.len() / 2) {
                    candidate.partition[v] = k;
                }
                candidate.tech_vector.push(random_tech(rng));
            } else if k > cfg.min_partitions.max(1) {
                // merge: fold the last partition into partition 0
                let last = k - 1;
                for p in candidate.partition.iter_mut() {
                    if *p == last {
                        *p = 0;
                    }
                }
                candidate.tech_vector.truncate(last.max(1));
            }
        }
    }
}

pub struct HybridGaOutcome {
    pub best_candidate: HybridCandidate,
    pub generations_run: usize,
}

#[allow(clippy::too_many_arguments)]
pub fn run_hybrid_ga(
    num_vertices: usize,
    floorplanner: &dyn Floorplanner,
    refiner: &dyn Refiner,
    ctx: &EvaluationContext,
    cfg: &HybridGaConfig,
    seed: u64,
) -> HybridGaOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut population = seed_population(num_vertices, cfg, &mut rng);

    let mut best: Option<HybridCandidate> = None;
    let mut generations_run = 0usize;

    for generation in 0..cfg.generations.max(1) {
        generations_run = generation + 1;

        for candidate in population.iter_mut() {
            repair_candidate(candidate, num_vertices, cfg, &mut rng);
        }

        population.par_iter_mut().enumerate().for_each(|(i, candidate)| {
            let candidate_seed = (seed ^ ((generation as u64) << 32)) ^ (i as u64);
            evaluate_hybrid_candidate(candidate, floorplanner, refiner, ctx, cfg, candidate_seed);
        });

        let gen_best_idx = population
            .iter()
            .enumerate()
            .filter(|(_, c)| c.valid)
            .min_by(|a, b| a.1.cost.partial_cmp(&b.1.cost).unwrap())
            .map(|(i, _)| i);

        if let Some(idx) = gen_best_idx {
            if best.as_ref().map(|b| population[idx].cost < b.cost).unwrap_or(true) {
                best = Some(population[idx].clone());
            }
        }

        let mut next_gen = Vec::with_capacity(cfg.population);
        if let Some(ref b) = best {
            next_gen.push(b.clone());
        }

        while next_gen.len() < cfg.population {
            let p1 = tournament_select(&population, cfg.tournament_size, &mut rng);
            let p2 = tournament_select(&population, cfg.tournament_size, &mut rng);
            let mut child = if rng.gen::<f64>() < cfg.crossover_rate {
                crossover(&population[p1], &population[p2], &mut rng)
            } else if population[p1].cost <= population[p2].cost {
                population[p1].clone()
            } else {
                population[p2].clone()
            };
            if rng.gen::<f64>() < cfg.mutation_rate {
                mutate(&mut child, cfg, &mut rng);
            }
            next_gen.push(child);
        }
        population = next_gen;
    }

    let best_candidate = best.unwrap_or_else(|| population[0].clone());
    HybridGaOutcome { best_candidate, generations_run }
}

fn tournament_select(population: &[HybridCandidate], tournament_size: usize, rng: &mut impl Rng) -> usize {
    let n = population.len();
    let mut best = rng.gen_range(0..n);
    for _ in 1..tournament_size {
        let cand = rng.gen_range(0..n);
        let cand_cost = if population[cand].valid { population[cand].cost } else { f64::MAX };
        let best_cost = if population[best].valid { population[best].cost } else { f64::MAX };
        if cand_cost < best_cost {
            best = cand;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[test]
    fn repair_makes_partition_ids_dense() {
        let mut candidate = HybridCandidate::new(vec![0, 2, 2, 5], vec![TechNode::N7]);
        let cfg = HybridGaConfig { min_partitions: 1, max_partitions: 8, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(1);
        repair_candidate(&mut candidate, 4, &cfg, &mut rng);
        let k = num_partitions_of(&candidate.partition);
        assert_eq!(candidate.tech_vector.len(), k);
        let mut ids: Vec<usize> = candidate.partition.clone();
        ids.sort();
        ids.dedup();
        assert_eq!(ids, (0..k).collect::<Vec<_>>());
    }

    #[test]
    fn repair_clamps_to_max_partitions() {
        let mut candidate = HybridCandidate::new((0..10).collect(), (0..10).map(|_| TechNode::N7).collect());
        let cfg = HybridGaConfig { min_partitions: 1, max_partitions: 3, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(2);
        repair_candidate(&mut candidate, 10, &cfg, &mut rng);
        assert!(num_partitions_of(&candidate.partition) <= 3);
        assert_eq!(candidate.tech_vector.len(), num_partitions_of(&candidate.partition));
    }

    #[test]
    fn repair_expands_below_min_partitions() {
        let mut candidate = HybridCandidate::new(vec![0; 20], vec![TechNode::N7]);
        let cfg = HybridGaConfig { min_partitions: 3, max_partitions: 8, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(3);
        repair_candidate(&mut candidate, 20, &cfg, &mut rng);
        assert!(num_partitions_of(&candidate.partition) >= 3);
    }
}
