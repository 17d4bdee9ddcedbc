use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Aggregate;

/// Errors produced by a malformed constraint declaration.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConstraintError {
    #[error("constraint has neither a lower nor an upper bound")]
    Unbounded,

    #[error("constraint bound is not finite: {value}")]
    NonFinite { value: f64 },

    #[error("constraint lower bound {lower} exceeds upper bound {upper}")]
    Inverted { lower: f64, upper: f64 },
}

/// The bounds of a constraint `l <= c(x) <= u`; a missing side is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConstraintBounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ConstraintBounds {
    /// Returns the number of `c(x) <= b` rows this constraint expands to.
    ///
    /// # Errors
    ///
    /// Returns an error if neither side is present, a side is not finite, or
    /// the sides are inverted.
    pub fn size(&self) -> Result<usize, ConstraintError> {
        for value in self.lower.into_iter().chain(self.upper) {
            if !value.is_finite() {
                return Err(ConstraintError::NonFinite { value });
            }
        }

        match (self.lower, self.upper) {
            (None, None) => Err(ConstraintError::Unbounded),
            (Some(lower), Some(upper)) if lower > upper => {
                Err(ConstraintError::Inverted { lower, upper })
            }
            (Some(_), Some(_)) => Ok(2),
            _ => Ok(1),
        }
    }

    /// Expands `value = c(x)` into its `c(x) <= b` rows, lower side first.
    ///
    /// A lower bound `l` yields `l - c(x)` and an upper bound `u` yields
    /// `c(x) - u`.
    pub fn residuals(&self, value: f64) -> impl Iterator<Item = f64> + use<> {
        let lower = self.lower.map(|lower| lower - value);
        let upper = self.upper.map(|upper| value - upper);
        lower.into_iter().chain(upper)
    }
}

/// A bounded aggregate, `l <= f <= u`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lower: Option<f64>,
    function: Aggregate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upper: Option<f64>,
}

impl Constraint {
    /// Creates a constraint from optional bounds.
    ///
    /// Bounds are checked when a model is built from the structure.
    #[must_use]
    pub fn new(lower: Option<f64>, function: Aggregate, upper: Option<f64>) -> Self {
        Self {
            lower,
            function,
            upper,
        }
    }

    #[must_use]
    pub fn at_least(function: Aggregate, lower: f64) -> Self {
        Self::new(Some(lower), function, None)
    }

    #[must_use]
    pub fn at_most(function: Aggregate, upper: f64) -> Self {
        Self::new(None, function, Some(upper))
    }

    #[must_use]
    pub fn between(function: Aggregate, lower: f64, upper: f64) -> Self {
        Self::new(Some(lower), function, Some(upper))
    }

    #[must_use]
    pub fn bounds(&self) -> ConstraintBounds {
        ConstraintBounds {
            lower: self.lower,
            upper: self.upper,
        }
    }

    #[must_use]
    pub fn function(&self) -> &Aggregate {
        &self.function
    }

    pub(crate) fn function_mut(&mut self) -> &mut Aggregate {
        &mut self.function
    }
}
