use std::{error::Error as StdError, io};

use opal_core::ParameterError;
use thiserror::Error;

use crate::structure::ConstraintError;

/// Errors that can occur when writing or reading a model data file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("data file i/o failed")]
    Io(#[from] io::Error),

    #[error("data file is not a valid model record")]
    Format(#[from] serde_json::Error),
}

/// Errors produced by [`Model`](super::Model) construction and evaluation.
///
/// A failed run of the algorithm under study is not an error: it surfaces as
/// `Ok(None)` from [`Model::evaluate`](super::Model::evaluate).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },

    #[error("model data declares no parameters")]
    NoParameters,

    #[error("parameter `{name}` is declared more than once")]
    DuplicateParameter { name: String },

    #[error("invalid parameter")]
    Parameter(#[from] ParameterError),

    #[error("constraint {index} is malformed")]
    Constraint {
        index: usize,
        #[source]
        source: ConstraintError,
    },

    #[error("point has {actual} entries, expected {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("failed to compute objective and constraints")]
    Structure(#[source] Box<dyn StdError + Send + Sync>),

    #[error("structure returned {actual} constraint values, expected {expected}")]
    ConstraintCount { expected: usize, actual: usize },

    #[error("failed to persist model")]
    Persist(#[from] PersistError),
}
