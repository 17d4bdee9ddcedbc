//! Black-box models for tuning algorithm parameters.
//!
//! A [`Model`] joins two collaborators:
//!
//! - a [`ModelData`], which declares the tunable parameters and runs the
//!   algorithm on a problem batch at a given point, and
//! - a [`ModelStructure`], which turns the measured results into an objective
//!   value and a constraint vector.
//!
//! The model is what an external solver sees: a function of the parameter
//! point that may fail, plus the initial point and bounds. Each model keeps a
//! serialized copy of itself in a data file for remote evaluation workers.

pub mod data;
pub mod model;
pub mod structure;

pub use data::{Assignment, BatchData, BatchError, ModelData, Runner, TestResult};
pub use model::{Config, Model, ModelError, ModelRecord, ModelSummary, PersistError};
pub use structure::{
    Aggregate, Constraint, ConstraintBounds, ConstraintError, Evaluation, ModelStructure,
    Reduction, Structure, StructureError,
};
