use std::{collections::HashMap, sync::Arc};

use opal_core::{MeasureValueTable, Parameter, TableError, Value};
use thiserror::Error;

use super::{ModelData, TestResult};

/// Runs the algorithm under study on a single problem.
///
/// Closures with the signature of [`Runner::run_problem`] implement this
/// trait.
pub trait Runner {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs `problem` at the point described by `assignment` and returns the
    /// measured value of every measure, keyed by measure name.
    ///
    /// # Errors
    ///
    /// Returns an error if the run failed or produced no result.
    fn run_problem(
        &self,
        problem: &str,
        assignment: &Assignment<'_>,
    ) -> Result<HashMap<String, f64>, Self::Error>;
}

impl<F, E> Runner for F
where
    F: Fn(&str, &Assignment<'_>) -> Result<HashMap<String, f64>, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    fn run_problem(
        &self,
        problem: &str,
        assignment: &Assignment<'_>,
    ) -> Result<HashMap<String, f64>, Self::Error> {
        self(problem, assignment)
    }
}

/// A point viewed through parameter names.
#[derive(Debug, Clone, Copy)]
pub struct Assignment<'a> {
    parameters: &'a [Parameter],
    point: &'a [Value],
}

impl<'a> Assignment<'a> {
    /// Pairs `point` with `parameters` position by position.
    pub fn new(parameters: &'a [Parameter], point: &'a [Value]) -> Self {
        Self { parameters, point }
    }

    /// Returns the value assigned to the parameter named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.parameters
            .iter()
            .position(|param| param.name() == name)
            .and_then(|index| self.point.get(index))
    }

    /// Returns the numeric value assigned to the parameter named `name`.
    #[must_use]
    pub fn real(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Iterates over `(name, value)` pairs in point order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + use<'a> {
        self.parameters
            .iter()
            .map(Parameter::name)
            .zip(self.point.iter())
    }
}

/// Errors that fail a batch run.
#[derive(Debug, Error)]
pub enum BatchError<E> {
    #[error("run of problem `{problem}` failed")]
    Run {
        problem: String,
        #[source]
        source: E,
    },

    #[error("results of problem `{problem}` are incomplete")]
    Table {
        problem: String,
        #[source]
        source: TableError,
    },
}

/// Model data that runs a fixed problem list in order, in process.
///
/// Every call to [`ModelData::run`] fills a fresh [`MeasureValueTable`] with
/// one row per problem. A single failing problem fails the whole batch.
#[derive(Debug, Clone)]
pub struct BatchData<R> {
    parameters: Vec<Parameter>,
    problems: Vec<String>,
    measures: Vec<String>,
    runner: R,
}

impl<R: Runner> BatchData<R> {
    /// Creates batch data over the active `parameters`.
    pub fn new<P, M>(parameters: Vec<Parameter>, problems: P, measures: M, runner: R) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            parameters,
            problems: problems.into_iter().map(Into::into).collect(),
            measures: measures.into_iter().map(Into::into).collect(),
            runner,
        }
    }

    #[must_use]
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    #[must_use]
    pub fn measures(&self) -> &[String] {
        &self.measures
    }

    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl<R: Runner> ModelData for BatchData<R> {
    type Error = BatchError<R::Error>;

    fn parameters(&self) -> Vec<Parameter> {
        self.parameters.clone()
    }

    fn run(&self, point: &[Value]) -> Result<TestResult, Self::Error> {
        let table = MeasureValueTable::new(&self.problems, &self.measures);
        let assignment = Assignment::new(&self.parameters, point);

        for problem in &self.problems {
            let values = self
                .runner
                .run_problem(problem, &assignment)
                .map_err(|source| BatchError::Run {
                    problem: problem.clone(),
                    source,
                })?;

            table
                .add_problem_measures(problem.as_str(), &values)
                .map_err(|source| BatchError::Table {
                    problem: problem.clone(),
                    source,
                })?;

            tracing::trace!(problem = problem.as_str(), "problem run complete");
        }

        Ok(TestResult::new(point.to_vec(), Arc::new(table)))
    }
}
