mod batch;

use std::sync::Arc;

use opal_core::{MeasureValueTable, Parameter, Value};

pub use batch::{Assignment, BatchData, BatchError, Runner};

/// Declares the tunable parameters and runs the algorithm under study.
///
/// `run` may take arbitrarily long: an implementation is free to dispatch the
/// problem batch to a remote platform and wait for it.
pub trait ModelData {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the tunable parameters in point order.
    fn parameters(&self) -> Vec<Parameter>;

    /// Runs the problem batch at `point`.
    ///
    /// `point` holds one value per parameter, in the order of
    /// [`ModelData::parameters`].
    ///
    /// # Errors
    ///
    /// Returns an error if the run did not produce a usable result.
    fn run(&self, point: &[Value]) -> Result<TestResult, Self::Error>;
}

/// The outcome of one batch run: the point and the measured values.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub point: Vec<Value>,
    pub table: Arc<MeasureValueTable>,
}

impl TestResult {
    pub fn new(point: Vec<Value>, table: Arc<MeasureValueTable>) -> Self {
        Self { point, table }
    }
}
