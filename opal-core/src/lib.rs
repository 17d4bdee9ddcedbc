//! Core building blocks for tuning an algorithm against a problem collection.
//!
//! A tuning run moves three kinds of data around:
//!
//! - [`Parameter`]s, the tunable inputs of the algorithm under study.
//! - [`MeasureValueTable`]s, the per-problem results of running the algorithm
//!   at one parameter point.
//! - [`Measure`]s, named handles onto one column of such a table.
//!
//! Measures are deduplicated by name through a [`MeasureRegistry`] owned by
//! the tuning run.

pub mod measure;
pub mod parameter;
pub mod table;

pub use measure::{Measure, MeasureError, MeasureKind, MeasureRegistry, Reading};
pub use parameter::{Bound, Parameter, ParameterError, ParameterKind, Value};
pub use table::{MeasureValueTable, TableError};
