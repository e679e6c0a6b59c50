use thiserror::Error;

/// Errors raised while reading or writing the text file formats in
/// [`crate::read`]/[`crate::write`].
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] sim_core::CoreError),

    #[error(transparent)]
    Econ(#[from] sim_econ::EconError),

    #[error("{path}: expected header `{expected}`, got `{got}`")]
    HeaderMismatch { path: String, expected: String, got: String },

    #[error("{path}: failed to parse field `{field}` from `{token}`")]
    Field { path: String, field: &'static str, token: String },

    #[error("{path}: {reason}")]
    Malformed { path: String, reason: String },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
