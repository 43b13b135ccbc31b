//! Expression evaluation errors

use thiserror::Error;

use crate::errors::DbError;

/// Result type for expression evaluation
pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Parameter ${0} not found")]
    ParamNotFound(String),

    #[error("Positional parameter {index} out of range ({count} given)")]
    PositionalOutOfRange { index: usize, count: usize },

    #[error("Positional parameters start at 1")]
    ZeroPositional,
}

impl From<EvalError> for DbError {
    fn from(err: EvalError) -> Self {
        DbError::eval(err.to_string())
    }
}
