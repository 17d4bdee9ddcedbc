use std::{
    borrow::Borrow,
    collections::HashMap,
    hash::Hash,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use thiserror::Error;

/// Errors produced by table lookups and appends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("unknown problem `{problem}`")]
    UnknownProblem { problem: String },

    #[error("unknown measure `{measure}`")]
    UnknownMeasure { measure: String },

    #[error("no value for measure `{measure}` in results of problem `{problem}`")]
    MissingMeasure { problem: String, measure: String },
}

/// Columnar storage of measure values, one row per problem run.
///
/// Columns are fixed at construction. Rows are appended one problem at a
/// time with [`MeasureValueTable::add_problem_measures`], which writes every
/// column under a single lock so that row `i` of each column always belongs
/// to the same problem run.
///
/// A table is usually shared behind an [`std::sync::Arc`] between the runner
/// that fills it and the measures bound to it, so every method takes `&self`.
#[derive(Debug)]
pub struct MeasureValueTable {
    measure_names: Vec<String>,
    declared_problems: Vec<String>,
    rows: RwLock<Rows>,
}

#[derive(Debug, Default)]
struct Rows {
    problems: Vec<String>,
    problem_indices: HashMap<String, usize>,
    columns: HashMap<String, Vec<f64>>,
}

impl MeasureValueTable {
    /// Creates an empty table.
    ///
    /// `problems` is the list of problems the caller intends to run; rows
    /// only exist once values are added. Duplicate measure names are kept
    /// once, at their first position.
    pub fn new<P, M>(problems: P, measures: M) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let mut measure_names: Vec<String> = Vec::new();
        for name in measures.into_iter().map(Into::into) {
            if !measure_names.contains(&name) {
                measure_names.push(name);
            }
        }

        let rows = Rows {
            columns: empty_columns(&measure_names),
            ..Rows::default()
        };

        Self {
            measure_names,
            declared_problems: problems.into_iter().map(Into::into).collect(),
            rows: RwLock::new(rows),
        }
    }

    /// Appends one row holding the values measured for `problem`.
    ///
    /// The row index is the number of rows appended so far. Adding the same
    /// problem twice creates a second row and later lookups by name resolve
    /// to the newest one. Entries of `values` that are not table columns are
    /// ignored.
    ///
    /// Returns the index of the new row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingMeasure`] if `values` lacks a column of
    /// this table, in which case no column is modified.
    pub fn add_problem_measures<K>(
        &self,
        problem: impl Into<String>,
        values: &HashMap<K, f64>,
    ) -> Result<usize, TableError>
    where
        K: Borrow<str> + Eq + Hash,
    {
        let problem = problem.into();

        let row: Vec<f64> = self
            .measure_names
            .iter()
            .map(|measure| {
                values
                    .get(measure.as_str())
                    .copied()
                    .ok_or_else(|| TableError::MissingMeasure {
                        problem: problem.clone(),
                        measure: measure.clone(),
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut rows = self.write();
        let index = rows.problems.len();
        for (measure, value) in self.measure_names.iter().zip(row) {
            rows.columns.entry(measure.clone()).or_default().push(value);
        }
        rows.problems.push(problem.clone());
        rows.problem_indices.insert(problem, index);

        Ok(index)
    }

    /// Returns the value of `measure` in the row of `problem`.
    ///
    /// # Errors
    ///
    /// Returns an error if either the measure or the problem is unknown.
    pub fn get_cell(&self, problem: &str, measure: &str) -> Result<f64, TableError> {
        let rows = self.read();

        let column = rows
            .columns
            .get(measure)
            .ok_or_else(|| TableError::UnknownMeasure {
                measure: measure.to_owned(),
            })?;

        rows.problem_indices
            .get(problem)
            .and_then(|&index| column.get(index))
            .copied()
            .ok_or_else(|| TableError::UnknownProblem {
                problem: problem.to_owned(),
            })
    }

    /// Returns a copy of the column of `measure` in row order.
    ///
    /// Returns `None` if `measure` is not a column of this table.
    #[must_use]
    pub fn get_column(&self, measure: &str) -> Option<Vec<f64>> {
        self.read().columns.get(measure).cloned()
    }

    /// Removes every row, keeping the columns and the declared problems.
    pub fn clear(&self) {
        let mut rows = self.write();
        let dropped = rows.problems.len();
        *rows = Rows {
            columns: empty_columns(&self.measure_names),
            ..Rows::default()
        };
        tracing::debug!(rows = dropped, "cleared measure value table");
    }

    /// Returns the column names in construction order.
    #[must_use]
    pub fn measure_names(&self) -> &[String] {
        &self.measure_names
    }

    /// Returns the problems declared at construction.
    #[must_use]
    pub fn declared_problems(&self) -> &[String] {
        &self.declared_problems
    }

    /// Returns the problem of each row in row order.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        self.read().problems.clone()
    }

    #[must_use]
    pub fn contains_measure(&self, measure: &str) -> bool {
        self.measure_names.iter().any(|name| name == measure)
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.read().problems.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    // A poisoned lock still guards consistent rows: appends validate before
    // taking the lock and never panic while holding it.
    fn read(&self) -> RwLockReadGuard<'_, Rows> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Rows> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn empty_columns(measure_names: &[String]) -> HashMap<String, Vec<f64>> {
    measure_names
        .iter()
        .map(|name| (name.clone(), Vec::new()))
        .collect()
}
