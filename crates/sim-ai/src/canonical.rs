//! Canonical GA (C6): searches over tech-node assignment vectors only. Each
//! individual's partition assignment and cost come from a [`TechPartitionOracle`]
//! that composes hypergraph refinement with the cost evaluator internally —
//! this crate only handles selection, crossover, mutation, and canonicalization.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use sim_core::tech::TechNode;

/// Given a tech vector, returns its cost and the partition assignment that
/// produced it. Implementations typically run a refiner/floorplanner pass
/// internally and then score the result with a cost evaluator.
pub trait TechPartitionOracle: Sync {
    fn evaluate_tech_vector(&self, techs: &[TechNode]) -> (f64, Vec<usize>);
}

#[derive(Debug, Clone)]
pub struct GaConfig {
    pub population: usize,
    pub generations: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    pub elite_count: usize,
    pub min_partitions: usize,
    pub max_partitions: usize,
    pub early_stop_window: usize,
    pub early_stop_threshold: f64,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population: 50,
            generations: 250,
            crossover_rate: 0.9,
            mutation_rate: 0.08,
            tournament_size: 3,
            elite_count: 2,
            min_partitions: 2,
            max_partitions: 8,
            early_stop_window: 50,
            early_stop_threshold: 1e-3,
        }
    }
}

/// Sorts the tech multiset by frequency descending, then tech-id ascending,
/// then expands it back to a list. Two tech vectors that are permutations of
/// the same multiset canonicalize to the same sequence.
pub fn canonical_tech_vector(techs: &[TechNode]) -> Vec<TechNode> {
    let mut counts: BTreeMap<TechNode, usize> = BTreeMap::new();
    for &t in techs {
        *counts.entry(t).or_insert(0) += 1;
    }
    let mut groups: Vec<(TechNode, usize)> = counts.into_iter().collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let mut out = Vec::with_capacity(techs.len());
    for (tech, count) in groups {
        out.extend(std::iter::repeat(tech).take(count));
    }
    out
}

pub fn canonical_key(techs: &[TechNode]) -> String {
    canonical_tech_vector(techs).iter().map(|t| t.as_str()).collect::<Vec<_>>().join(",")
}

fn random_tech(rng: &mut impl Rng) -> TechNode {
    *TechNode::ALL.choose(rng).expect("TechNode::ALL is non-empty")
}

fn random_tech_vector(rng: &mut impl Rng, cfg: &GaConfig) -> Vec<TechNode> {
    let len = rng.gen_range(cfg.min_partitions..=cfg.max_partitions.max(cfg.min_partitions));
    (0..len).map(|_| random_tech(rng)).collect()
}

fn clamp_length(mut v: Vec<TechNode>, cfg: &GaConfig, rng: &mut impl Rng) -> Vec<TechNode> {
    while v.len() < cfg.min_partitions {
        v.push(random_tech(rng));
    }
    if v.len() > cfg.max_partitions {
        v.truncate(cfg.max_partitions.max(cfg.min_partitions));
    }
    v
}

#[derive(Clone, Copy)]
enum CrossoverKind {
    OnePoint,
    TwoPoint,
    Uniform,
}

fn crossover_one_point(p1: &[TechNode], p2: &[TechNode], rng: &mut impl Rng) -> Vec<TechNode> {
    let bound = p1.len().min(p2.len());
    if bound == 0 {
        return p1.to_vec();
    }
    let k = rng.gen_range(0..=bound);
    let mut child = p1[..k].to_vec();
    child.extend_from_slice(&p2[k..]);
    child
}

fn crossover_two_point(p1: &[TechNode], p2: &[TechNode], rng: &mut impl Rng) -> Vec<TechNode> {
    let bound = p1.len().min(p2.len());
    if bound < 2 {
        return crossover_one_point(p1, p2, rng);
    }
    let mut a = rng.gen_range(0..bound);
    let mut b = rng.gen_range(0..bound);
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }
    let mut child = p1[..a].to_vec();
    child.extend_from_slice(&p2[a..b]);
    child.extend_from_slice(&p1[b..]);
    child
}

fn crossover_uniform(p1: &[TechNode], p2: &[TechNode], rng: &mut impl Rng) -> Vec<TechNode> {
    let len = if rng.gen::<bool>() { p1.len() } else { p2.len() };
    (0..len)
        .map(|i| {
            if rng.gen::<bool>() {
                p1.get(i).or_else(|| p2.get(i)).copied().unwrap_or_else(|| random_tech(rng))
            } else {
                p2.get(i).or_else(|| p1.get(i)).copied().unwrap_or_else(|| random_tech(rng))
            }
        })
        .collect()
}

fn crossover(p1: &[TechNode], p2: &[TechNode], cfg: &GaConfig, rng: &mut impl Rng) -> Vec<TechNode> {
    let kind = *[CrossoverKind::OnePoint, CrossoverKind::TwoPoint, CrossoverKind::Uniform]
        .choose(rng)
        .expect("non-empty");
    let child = match kind {
        CrossoverKind::OnePoint => crossover_one_point(p1, p2, rng),
        CrossoverKind::TwoPoint => crossover_two_point(p1, p2, rng),
        CrossoverKind::Uniform => crossover_uniform(p1, p2, rng),
    };
    clamp_length(child, cfg, rng)
}

fn mutate(v: &mut Vec<TechNode>, cfg: &GaConfig, rng: &mut impl Rng) {
    if v.is_empty() {
        return;
    }
    match rng.gen_range(0..3) {
        0 => {
            let i = rng.gen_range(0..v.len());
            v[i] = random_tech(rng);
        }
        1 => {
            if rng.gen::<bool>() && v.len() < cfg.max_partitions {
                v.push(random_tech(rng));
            } else if v.len() > cfg.min_partitions.max(1) {
                let i = rng.gen_range(0..v.len());
                v.remove(i);
            }
        }
        _ => {
            if v.len() >= 2 {
                let i = rng.gen_range(0..v.len());
                let j = rng.gen_range(0..v.len());
                v.swap(i, j);
            }
        }
    }
}

fn tournament_select(fitness: &[(f64, Vec<usize>)], tournament_size: usize, rng: &mut impl Rng) -> usize {
    let n = fitness.len();
    let mut best = rng.gen_range(0..n);
    for _ in 1..tournament_size {
        let cand = rng.gen_range(0..n);
        if fitness[cand].0 < fitness[best].0 {
            best = cand;
        }
    }
    best
}

fn evaluate_cached(
    oracle: &dyn TechPartitionOracle,
    cache: &Mutex<HashMap<String, (f64, Vec<usize>)>>,
    techs: &[TechNode],
) -> (f64, Vec<usize>) {
    let key = canonical_key(techs);
    {
        let cache_read = cache.lock().unwrap();
        if let Some(v) = cache_read.get(&key) {
            return v.clone();
        }
    }
    let result = oracle.evaluate_tech_vector(techs);
    let mut cache_write = cache.lock().unwrap();
    cache_write.entry(key).or_insert_with(|| result.clone()).clone()
}

pub struct GaOutcome {
    pub best_tech_vector: Vec<TechNode>,
    pub best_cost: f64,
    pub best_partition: Vec<usize>,
    pub generations_run: usize,
}

pub fn run_canonical_ga(oracle: &dyn TechPartitionOracle, cfg: &GaConfig, seed: u64) -> GaOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut population: Vec<Vec<TechNode>> = (0..cfg.population.max(1)).map(|_| random_tech_vector(&mut rng, cfg)).collect();
    let cache: Mutex<HashMap<String, (f64, Vec<usize>)>> = Mutex::new(HashMap::new());

    let mut best_cost = f64::MAX;
    let mut best_tech_vector = population[0].clone();
    let mut best_partition: Vec<usize> = Vec::new();
    let mut stale_generations = 0usize;
    let mut generations_run = 0usize;

    for generation in 0..cfg.generations {
        generations_run = generation + 1;
        let fitness: Vec<(f64, Vec<usize>)> =
            population.par_iter().map(|ind| evaluate_cached(oracle, &cache, ind)).collect();

        let gen_min = fitness.iter().map(|f| f.0).fold(f64::INFINITY, f64::min);
        let gen_max = fitness.iter().map(|f| f.0).fold(f64::NEG_INFINITY, f64::max);

        let mut order: Vec<usize> = (0..population.len()).collect();
        order.sort_by(|&a, &b| fitness[a].0.partial_cmp(&fitness[b].0).unwrap());

        let gen_best = order[0];
        if fitness[gen_best].0 < best_cost {
            best_cost = fitness[gen_best].0;
            best_tech_vector = population[gen_best].clone();
            best_partition = fitness[gen_best].1.clone();
            stale_generations = 0;
        } else {
            stale_generations += 1;
        }

        if stale_generations >= cfg.early_stop_window && (gen_max - gen_min) < cfg.early_stop_threshold {
            break;
        }

        let mut next_gen: Vec<Vec<TechNode>> =
            order.iter().take(cfg.elite_count.min(population.len())).map(|&i| population[i].clone()).collect();
        while next_gen.len() < cfg.population {
            let p1 = tournament_select(&fitness, cfg.tournament_size, &mut rng);
            let p2 = tournament_select(&fitness, cfg.tournament_size, &mut rng);
            let mut child = if rng.gen::<f64>() < cfg.crossover_rate {
                crossover(&population[p1], &population[p2], cfg, &mut rng)
            } else if fitness[p1].0 <= fitness[p2].0 {
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

    GaOutcome { best_tech_vector, best_cost, best_partition, generations_run }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct ConstantOracle;
    impl TechPartitionOracle for ConstantOracle {
        fn evaluate_tech_vector(&self, techs: &[TechNode]) -> (f64, Vec<usize>) {
            (techs.len() as f64, (0..techs.len()).collect())
        }
    }

    struct CountingOracle(std::sync::atomic::AtomicUsize);
    impl TechPartitionOracle for CountingOracle {
        fn evaluate_tech_vector(&self, techs: &[TechNode]) -> (f64, Vec<usize>) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            (techs.len() as f64, (0..techs.len()).collect())
        }
    }

    #[test]
    fn canonicalization_ignores_order() {
        let a = vec![TechNode::N7, TechNode::N45, TechNode::N7];
        let b = vec![TechNode::N45, TechNode::N7, TechNode::N7];
        assert_eq!(canonical_key(&a), canonical_key(&b));
    }

    proptest::proptest! {
        #[test]
        fn canonicalization_is_permutation_invariant(
            techs in proptest::collection::vec(proptest::sample::select(&TechNode::ALL[..]), 0..12),
            shuffle_seed in any::<u64>(),
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(shuffle_seed);
            let mut shuffled = techs.clone();
            shuffled.shuffle(&mut rng);
            prop_assert_eq!(canonical_tech_vector(&techs), canonical_tech_vector(&shuffled));
        }
    }

    #[test]
    fn canonical_ga_prefers_shorter_vectors_under_constant_oracle() {
        let cfg = GaConfig { population: 8, generations: 10, min_partitions: 1, max_partitions: 4, ..Default::default() };
        let outcome = run_canonical_ga(&ConstantOracle, &cfg, 42);
        assert_eq!(outcome.best_tech_vector.len(), 1);
        assert_eq!(outcome.best_cost, 1.0);
    }

    #[test]
    fn fitness_cache_deduplicates_canonically_equal_individuals() {
        let cfg = GaConfig { population: 6, generations: 3, min_partitions: 2, max_partitions: 2, ..Default::default() };
        let oracle = CountingOracle(std::sync::atomic::AtomicUsize::new(0));
        let _ = run_canonical_ga(&oracle, &cfg, 7);
        let calls = oracle.0.load(std::sync::atomic::Ordering::SeqCst);
        // at most 11 distinct tech-id orderings of length 2 over TechNode::ALL
        assert!(calls <= TechNode::ALL.len() * TechNode::ALL.len());
    }
}
