use thiserror::Error;

/// Errors raised by process records, the scaling tables, and the chip tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("unknown technology node: {0}")]
    UnknownTechNode(String),

    #[error("record underspecified, missing fields: {0:?}")]
    Underspecified(Vec<&'static str>),

    #[error("cannot set {0}: record is frozen")]
    FrozenMutation(&'static str),

    #[error("range violation on {field}: {value} violates bound {bound}")]
    RangeViolation {
        field: &'static str,
        value: f64,
        bound: &'static str,
    },

    #[error("invalid partition: {0}")]
    InvalidPartition(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
