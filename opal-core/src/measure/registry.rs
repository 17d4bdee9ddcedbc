use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{Measure, MeasureKind};
use crate::table::MeasureValueTable;

/// The set of canonical measures of one tuning run.
///
/// A registry holds at most one measure per name. It is owned by the run and
/// passed by reference to whatever needs to create or resolve measures, so
/// separate runs (and separate tests) never see each other's measures.
///
/// Lookup-and-insert happens under a single lock, which keeps the
/// one-measure-per-name guarantee when measures are created from several
/// threads at once.
#[derive(Debug, Default)]
pub struct MeasureRegistry {
    measures: Mutex<HashMap<String, Measure>>,
}

impl MeasureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical measure for `name`, registering a new one with
    /// `kind` if none exists.
    ///
    /// When `name` is already registered the existing measure is returned
    /// unchanged and `kind` is ignored.
    pub fn create(&self, name: &str, kind: Option<MeasureKind>) -> Measure {
        let mut measures = self.lock();

        if let Some(existing) = measures.get(name) {
            if existing.kind() != kind {
                tracing::debug!(
                    measure = name,
                    registered = ?existing.kind(),
                    requested = ?kind,
                    "measure already registered with another kind"
                );
            }
            return existing.clone();
        }

        let measure = Measure::new(name, kind);
        measures.insert(name.to_owned(), measure.clone());
        measure
    }

    /// Resolves `measure` to the canonical measure of its name.
    ///
    /// Registers `measure` itself if its name is unknown. Otherwise returns
    /// the registered measure, which is `measure` when it is already
    /// canonical.
    ///
    /// Call this on every measure obtained by deserialization before reading
    /// through it: a deserialized handle is never bound.
    pub fn resolve(&self, measure: &Measure) -> Measure {
        let mut measures = self.lock();

        if let Some(canonical) = measures.get(measure.name()) {
            if !canonical.ptr_eq(measure) {
                tracing::debug!(measure = measure.name(), "replaced duplicate measure");
            }
            return canonical.clone();
        }

        measures.insert(measure.name().to_owned(), measure.clone());
        measure.clone()
    }

    /// Returns the canonical measure for `name`, if registered.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Measure> {
        self.lock().get(name).cloned()
    }

    /// Binds every registered measure to `table`.
    pub fn bind_all(&self, table: &Arc<MeasureValueTable>) {
        for measure in self.lock().values() {
            measure.bind_data(Arc::clone(table));
        }
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Measure>> {
        self.measures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
