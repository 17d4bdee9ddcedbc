mod aggregate;
mod constraint;

use opal_core::MeasureRegistry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::TestResult;

pub use aggregate::{Aggregate, Reduction};
pub use constraint::{Constraint, ConstraintBounds, ConstraintError};

/// Objective value and constraint values at one point.
///
/// Constraint values are in `c(x) <= 0` form: a point is feasible when every
/// entry is non-positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub objective: f64,
    pub constraints: Vec<f64>,
}

/// Turns the results of a batch run into an objective and constraints.
pub trait ModelStructure {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the bounds `l <= c(x) <= u` of each constraint, in order.
    fn constraint_bounds(&self) -> Vec<ConstraintBounds>;

    /// Computes the objective and constraint values from `result`.
    ///
    /// The constraint vector has one entry per finite side of each
    /// constraint, in the order of [`ModelStructure::constraint_bounds`].
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be computed from `result`.
    fn evaluate(&self, result: &TestResult) -> Result<Evaluation, Self::Error>;

    /// Replaces every measure handle held by this structure with the
    /// canonical one from `registry`.
    ///
    /// Structures that hold no measures keep the default no-op.
    fn resolve_measures(&mut self, _registry: &MeasureRegistry) {}
}

/// Errors produced when evaluating a [`Structure`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error(transparent)]
    Measure(#[from] opal_core::MeasureError),

    #[error("cannot reduce the empty column of measure `{measure}`")]
    EmptyColumn { measure: String },
}

/// A structure whose objective and constraints are aggregates of measures.
///
/// ```
/// use opal_core::{MeasureKind, MeasureRegistry};
/// use opal_model::{Aggregate, Constraint, Structure};
///
/// let registry = MeasureRegistry::new();
/// let heval = registry.create("HEVAL", Some(MeasureKind::Integer));
/// let ecode = registry.create("ECODE", Some(MeasureKind::Integer));
///
/// let structure = Structure::new(Aggregate::sum(&heval))
///     .with_constraint(Constraint::at_most(Aggregate::sum(&ecode), 0.0));
/// assert_eq!(structure.constraints().len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    objective: Aggregate,
    #[serde(default)]
    constraints: Vec<Constraint>,
}

impl Structure {
    /// Creates an unconstrained structure.
    #[must_use]
    pub fn new(objective: Aggregate) -> Self {
        Self {
            objective,
            constraints: Vec::new(),
        }
    }

    /// Appends a constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn objective(&self) -> &Aggregate {
        &self.objective
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

impl ModelStructure for Structure {
    type Error = StructureError;

    fn constraint_bounds(&self) -> Vec<ConstraintBounds> {
        self.constraints.iter().map(Constraint::bounds).collect()
    }

    fn evaluate(&self, result: &TestResult) -> Result<Evaluation, Self::Error> {
        let objective = self.objective.evaluate(&result.table)?;

        let mut constraints = Vec::new();
        for constraint in &self.constraints {
            let value = constraint.function().evaluate(&result.table)?;
            constraints.extend(constraint.bounds().residuals(value));
        }

        Ok(Evaluation {
            objective,
            constraints,
        })
    }

    fn resolve_measures(&mut self, registry: &MeasureRegistry) {
        self.objective.resolve(registry);
        for constraint in &mut self.constraints {
            constraint.function_mut().resolve(registry);
        }
    }
}
