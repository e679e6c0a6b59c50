use thiserror::Error;

/// Errors a candidate's fitness evaluation can raise internally. Every
/// variant is caught at the evaluation boundary and mapped to
/// `(cost = MAX_FINITE_COST, valid = false)` — see [`crate::hybrid::evaluate_hybrid_candidate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AiError {
    #[error("floorplanner reported failure for {num_partitions} partitions")]
    FloorplannerFailed { num_partitions: usize },

    #[error("degenerate partition: {num_partitions} partitions but {tech_vector_len} tech entries")]
    DegeneratePartition { num_partitions: usize, tech_vector_len: usize },

    #[error(transparent)]
    Evaluator(#[from] sim_econ::EconError),
}

pub type AiResult<T> = Result<T, AiError>;
