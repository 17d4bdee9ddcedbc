use std::sync::Arc;

use opal_core::{Measure, MeasureError, MeasureRegistry, MeasureValueTable, TableError};
use serde::{Deserialize, Serialize};

use super::StructureError;

/// How a measure column is reduced to a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    Mean,
    Min,
    Max,
    /// Number of problems with a non-zero value, e.g. failed runs from an
    /// error code measure.
    CountNonZero,
}

impl Reduction {
    /// Reduces `values`, returning `None` when an empty column has no
    /// meaningful reduction.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Sum => Some(values.iter().sum()),
            Self::CountNonZero => Some(values.iter().filter(|&&x| x != 0.0).count() as f64),
            _ if values.is_empty() => None,
            Self::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Min => values.iter().copied().reduce(f64::min),
            Self::Max => values.iter().copied().reduce(f64::max),
        }
    }
}

/// A reduction over the column of one measure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregate {
    measure: Measure,
    reduction: Reduction,
}

impl Aggregate {
    #[must_use]
    pub fn new(measure: &Measure, reduction: Reduction) -> Self {
        Self {
            measure: measure.clone(),
            reduction,
        }
    }

    #[must_use]
    pub fn sum(measure: &Measure) -> Self {
        Self::new(measure, Reduction::Sum)
    }

    #[must_use]
    pub fn mean(measure: &Measure) -> Self {
        Self::new(measure, Reduction::Mean)
    }

    #[must_use]
    pub fn min(measure: &Measure) -> Self {
        Self::new(measure, Reduction::Min)
    }

    #[must_use]
    pub fn max(measure: &Measure) -> Self {
        Self::new(measure, Reduction::Max)
    }

    #[must_use]
    pub fn count_non_zero(measure: &Measure) -> Self {
        Self::new(measure, Reduction::CountNonZero)
    }

    #[must_use]
    pub fn measure(&self) -> &Measure {
        &self.measure
    }

    #[must_use]
    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    /// Reduces the column of the measure in `table`.
    ///
    /// The value is always computed from `table` itself. The measure is also
    /// bound to `table` so callers can read the last batch through it, but
    /// concurrent evaluations may rebind it at any time.
    ///
    /// # Errors
    ///
    /// Returns an error if the table has no column for the measure, or if
    /// the column is empty and the reduction needs at least one value.
    pub fn evaluate(&self, table: &Arc<MeasureValueTable>) -> Result<f64, StructureError> {
        let values = table
            .get_column(self.measure.name())
            .ok_or_else(|| {
                MeasureError::Table(TableError::UnknownMeasure {
                    measure: self.measure.name().to_owned(),
                })
            })?;
        self.measure.bind_data(Arc::clone(table));

        self.reduction
            .apply(&values)
            .ok_or_else(|| StructureError::EmptyColumn {
                measure: self.measure.name().to_owned(),
            })
    }

    pub(crate) fn resolve(&mut self, registry: &MeasureRegistry) {
        self.measure = registry.resolve(&self.measure);
    }
}
