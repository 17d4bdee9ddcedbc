use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of a tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Real,
    Integer,
    Binary,
    Categorical,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Real => "real",
            Self::Integer => "integer",
            Self::Binary => "binary",
            Self::Categorical => "categorical",
        };
        f.write_str(name)
    }
}

/// A value taken by a parameter.
///
/// Points handed to a model are slices of `Value`, one per parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Real(f64),
    Integer(i64),
    Binary(bool),
    Categorical(String),
}

impl Value {
    /// Returns the parameter kind this value belongs to.
    #[must_use]
    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Real(_) => ParameterKind::Real,
            Self::Integer(_) => ParameterKind::Integer,
            Self::Binary(_) => ParameterKind::Binary,
            Self::Categorical(_) => ParameterKind::Categorical,
        }
    }

    /// Returns the numeric view of the value.
    ///
    /// Binary values map to `0.0` and `1.0`.
    /// Categorical values have no numeric view and return `None`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(x) => Some(*x),
            Self::Integer(n) => Some(*n as f64),
            Self::Binary(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Categorical(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Binary(value)
    }
}

/// The domain a parameter value must lie in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bound {
    #[default]
    Unbounded,
    /// A closed interval; a missing side is unbounded.
    Interval {
        lower: Option<f64>,
        upper: Option<f64>,
    },
    /// The admissible values of a categorical parameter.
    Choices(Vec<String>),
}

impl Bound {
    /// Creates an interval bounded on both sides.
    #[must_use]
    pub fn between(lower: f64, upper: f64) -> Self {
        Self::Interval {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    /// Creates an interval bounded from below.
    #[must_use]
    pub fn at_least(lower: f64) -> Self {
        Self::Interval {
            lower: Some(lower),
            upper: None,
        }
    }

    /// Creates an interval bounded from above.
    #[must_use]
    pub fn at_most(upper: f64) -> Self {
        Self::Interval {
            lower: None,
            upper: Some(upper),
        }
    }

    /// Returns `true` if `value` lies within this bound.
    ///
    /// Intervals only admit numeric values and choices only admit
    /// categorical values.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Unbounded, _) => true,
            (Self::Choices(choices), Value::Categorical(choice)) => choices.contains(choice),
            (Self::Choices(_), _) => false,
            (Self::Interval { lower, upper }, value) => value.as_f64().is_some_and(|x| {
                lower.is_none_or(|lower| x >= lower) && upper.is_none_or(|upper| x <= upper)
            }),
        }
    }
}

/// Errors produced when a parameter declaration is malformed.
#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("parameter `{name}` has a non-finite value")]
    NonFiniteValue { name: String },

    #[error("parameter `{name}` has an invalid interval [{lower:?}, {upper:?}]")]
    InvalidInterval {
        name: String,
        lower: Option<f64>,
        upper: Option<f64>,
    },

    #[error("parameter `{name}` of kind {kind} cannot use a {bound} bound")]
    BoundKindMismatch {
        name: String,
        kind: ParameterKind,
        bound: &'static str,
    },

    #[error("parameter `{name}` starts outside its bound")]
    OutOfBound { name: String },
}

/// A tunable input of the algorithm under study.
///
/// The parameter kind is the kind of its current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    value: Value,
    #[serde(default)]
    bound: Bound,
}

impl Parameter {
    /// Creates an unbounded parameter with the given current value.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            bound: Bound::Unbounded,
        }
    }

    /// Creates a real parameter.
    pub fn real(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Value::Real(value))
    }

    /// Creates an integer parameter.
    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self::new(name, Value::Integer(value))
    }

    /// Creates a binary parameter.
    pub fn binary(name: impl Into<String>, value: bool) -> Self {
        Self::new(name, Value::Binary(value))
    }

    /// Creates a categorical parameter whose bound is its list of choices.
    pub fn categorical<I, S>(name: impl Into<String>, value: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            value: Value::Categorical(value.into()),
            bound: Bound::Choices(choices.into_iter().map(Into::into).collect()),
        }
    }

    /// Replaces the bound of this parameter.
    #[must_use]
    pub fn with_bound(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn bound(&self) -> &Bound {
        &self.bound
    }

    #[must_use]
    pub fn kind(&self) -> ParameterKind {
        self.value.kind()
    }

    #[must_use]
    pub fn is_real(&self) -> bool {
        self.kind() == ParameterKind::Real
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.kind() == ParameterKind::Integer
    }

    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.kind() == ParameterKind::Binary
    }

    #[must_use]
    pub fn is_categorical(&self) -> bool {
        self.kind() == ParameterKind::Categorical
    }

    /// Checks that the declaration is consistent.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is non-finite, the bound does not suit
    /// the parameter kind, the interval is inverted or non-finite, or the
    /// current value lies outside the bound.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if let Value::Real(x) = self.value {
            if !x.is_finite() {
                return Err(ParameterError::NonFiniteValue {
                    name: self.name.clone(),
                });
            }
        }

        match (&self.bound, self.kind()) {
            (Bound::Unbounded, _) => {}
            (Bound::Interval { .. }, ParameterKind::Categorical) => {
                return Err(self.mismatch("interval"));
            }
            (Bound::Choices(_), kind) if kind != ParameterKind::Categorical => {
                return Err(self.mismatch("choices"));
            }
            (Bound::Interval { lower, upper }, _) => {
                let finite = lower.is_none_or(f64::is_finite) && upper.is_none_or(f64::is_finite);
                let ordered = match (lower, upper) {
                    (Some(lower), Some(upper)) => lower <= upper,
                    _ => true,
                };
                if !finite || !ordered {
                    return Err(ParameterError::InvalidInterval {
                        name: self.name.clone(),
                        lower: *lower,
                        upper: *upper,
                    });
                }
            }
            (Bound::Choices(_), _) => {}
        }

        if self.bound.contains(&self.value) {
            Ok(())
        } else {
            Err(ParameterError::OutOfBound {
                name: self.name.clone(),
            })
        }
    }

    fn mismatch(&self, bound: &'static str) -> ParameterError {
        ParameterError::BoundKindMismatch {
            name: self.name.clone(),
            kind: self.kind(),
            bound,
        }
    }
}
