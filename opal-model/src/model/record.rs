use std::{fs::File, io::BufReader, path::Path};

use opal_core::{Bound, MeasureRegistry, Parameter, Value};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::PersistError;
use crate::structure::ModelStructure;

/// What a model knows about its parameters and constraints, fixed when the
/// model is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub parameters: Vec<Parameter>,
    pub n_var: usize,
    pub n_real: usize,
    pub n_integer: usize,
    pub n_binary: usize,
    pub n_categorical: usize,
    /// Number of constraint rows in `c(x) <= b` form.
    pub m_con: usize,
    pub initial_point: Vec<Value>,
    pub bounds: Vec<Bound>,
}

impl ModelSummary {
    /// Snapshots `parameters` together with the constraint row count.
    pub(crate) fn new(parameters: Vec<Parameter>, m_con: usize) -> Self {
        let count = |pred: fn(&Parameter) -> bool| parameters.iter().filter(|p| pred(p)).count();

        Self {
            n_var: parameters.len(),
            n_real: count(Parameter::is_real),
            n_integer: count(Parameter::is_integer),
            n_binary: count(Parameter::is_binary),
            n_categorical: count(Parameter::is_categorical),
            m_con,
            initial_point: parameters.iter().map(|p| p.value().clone()).collect(),
            bounds: parameters.iter().map(|p| p.bound().clone()).collect(),
            parameters,
        }
    }
}

/// Borrowed form of [`ModelRecord`], used when writing a data file.
#[derive(Serialize)]
pub(crate) struct RecordRef<'a, S> {
    #[serde(flatten)]
    pub(crate) summary: &'a ModelSummary,
    pub(crate) structure: &'a S,
}

/// The contents of a model data file.
///
/// This is what a remote worker reads to rebuild the model it evaluates.
/// [`ModelRecord::load_with`] resolves the structure's measures against the
/// worker's registry as it loads. Measures in a structure read with
/// [`ModelRecord::load`] are detached until [`ModelRecord::reconcile`] runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord<S> {
    #[serde(flatten)]
    pub summary: ModelSummary,
    pub structure: S,
}

impl<S: DeserializeOwned> ModelRecord<S> {
    /// Reads a record from a data file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold a record.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let file = File::open(path.as_ref())?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

impl<S: ModelStructure> ModelRecord<S> {
    /// Reads a record from a data file and reconciles its measures with
    /// `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold a record.
    pub fn load_with(
        path: impl AsRef<Path>,
        registry: &MeasureRegistry,
    ) -> Result<Self, PersistError>
    where
        S: DeserializeOwned,
    {
        let mut record = Self::load(path)?;
        record.reconcile(registry);
        Ok(record)
    }

    /// Resolves every measure of the structure against `registry`.
    pub fn reconcile(&mut self, registry: &MeasureRegistry) {
        self.structure.resolve_measures(registry);
    }
}
