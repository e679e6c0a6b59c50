#![deny(warnings)]

//! Tech/partition co-optimization search: a canonical GA over tech-node
//! vectors alone (C6), a hybrid GA over joint (partition, tech-vector)
//! candidates (C7), and the `Floorplanner`/`Refiner` collaborator traits
//! the hybrid search composes against (C8).

pub mod canonical;
pub mod collaborators;
pub mod error;
pub mod hybrid;

pub use canonical::{run_canonical_ga, GaConfig, GaOutcome, TechPartitionOracle};
pub use collaborators::{Floorplanner, FloorplanResult, GreedyRefiner, Hypergraph, Refiner, RowFloorplanner};
pub use error::{AiError, AiResult};
pub use hybrid::{evaluate_hybrid_candidate, repair_candidate, run_hybrid_ga, EvaluationContext, HybridCandidate, HybridGaConfig, HybridGaOutcome};
