mod registry;

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::{MeasureValueTable, TableError};

pub use registry::MeasureRegistry;

/// The numeric kind a measure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureKind {
    Real,
    Integer,
}

/// Errors produced when reading a measure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeasureError {
    #[error("measure `{name}` is not bound to a value table")]
    NotBound { name: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// The result of [`Measure::read`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Scalar(f64),
    Vector(Vec<f64>),
}

/// A named handle onto one column of a [`MeasureValueTable`].
///
/// Cloning a `Measure` clones the handle, not the measure: clones share
/// their name and their table binding. Two handles are the same measure when
/// [`Measure::ptr_eq`] holds.
///
/// Handles are meant to be canonical per name within a tuning run, which is
/// what [`MeasureRegistry`] provides. A handle built with [`Measure::new`] or
/// obtained by deserialization is detached until passed through
/// [`MeasureRegistry::resolve`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "MeasureSpec", into = "MeasureSpec")]
pub struct Measure {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    kind: Option<MeasureKind>,
    data: RwLock<Option<Arc<MeasureValueTable>>>,
}

/// Serialized form of a measure: its identity without its binding.
#[derive(Serialize, Deserialize)]
struct MeasureSpec {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<MeasureKind>,
}

impl Measure {
    /// Creates a detached measure handle.
    ///
    /// Prefer [`MeasureRegistry::create`], which returns the canonical
    /// handle for `name`.
    pub fn new(name: impl Into<String>, kind: Option<MeasureKind>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                kind,
                data: RwLock::new(None),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn kind(&self) -> Option<MeasureKind> {
        self.inner.kind
    }

    #[must_use]
    pub fn is_real(&self) -> bool {
        self.inner.kind == Some(MeasureKind::Real)
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.inner.kind == Some(MeasureKind::Integer)
    }

    /// Returns `true` if both handles refer to the same measure.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Binds this measure to `table`, replacing any previous binding.
    ///
    /// The binding is shared by every clone of this handle.
    pub fn bind_data(&self, table: Arc<MeasureValueTable>) {
        *self
            .inner
            .data
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(table);
    }

    /// Returns the table this measure is bound to, if any.
    #[must_use]
    pub fn data(&self) -> Option<Arc<MeasureValueTable>> {
        self.inner
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.data().is_some()
    }

    /// Returns the value this measure took on `problem`.
    ///
    /// # Errors
    ///
    /// Returns an error if the measure is unbound, or if the bound table has
    /// no such problem or no such column.
    pub fn read_scalar(&self, problem: &str) -> Result<f64, MeasureError> {
        let table = self.bound_table()?;
        Ok(table.get_cell(problem, self.name())?)
    }

    /// Returns the values this measure took on every problem, in row order.
    ///
    /// # Errors
    ///
    /// Returns an error if the measure is unbound or the bound table has no
    /// column for it.
    pub fn read_vector(&self) -> Result<Vec<f64>, MeasureError> {
        let table = self.bound_table()?;
        table
            .get_column(self.name())
            .ok_or_else(|| MeasureError::Table(TableError::UnknownMeasure {
                measure: self.name().to_owned(),
            }))
    }

    /// Reads one problem's value, or the whole column when `problem` is `None`.
    ///
    /// # Errors
    ///
    /// See [`Measure::read_scalar`] and [`Measure::read_vector`].
    pub fn read(&self, problem: Option<&str>) -> Result<Reading, MeasureError> {
        match problem {
            Some(problem) => self.read_scalar(problem).map(Reading::Scalar),
            None => self.read_vector().map(Reading::Vector),
        }
    }

    fn bound_table(&self) -> Result<Arc<MeasureValueTable>, MeasureError> {
        self.data().ok_or_else(|| MeasureError::NotBound {
            name: self.name().to_owned(),
        })
    }
}

impl fmt::Debug for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Measure")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl From<MeasureSpec> for Measure {
    fn from(spec: MeasureSpec) -> Self {
        Self::new(spec.name, spec.kind)
    }
}

impl From<Measure> for MeasureSpec {
    fn from(measure: Measure) -> Self {
        Self {
            name: measure.inner.name.clone(),
            kind: measure.inner.kind,
        }
    }
}
