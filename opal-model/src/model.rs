mod config;
mod data_file;
mod error;
mod record;

use std::{collections::HashSet, path::Path};

use opal_core::{Bound, Parameter, Value};
use serde::Serialize;

use crate::{
    data::ModelData,
    structure::{Evaluation, ModelStructure},
};

pub use config::Config;
pub use error::{ModelError, PersistError};
pub use record::{ModelRecord, ModelSummary};

use data_file::DataFile;
use record::RecordRef;

/// A black-box parameter optimization problem.
///
/// A `Model` pairs a [`ModelData`], which runs the algorithm under study, with
/// a [`ModelStructure`], which scores the results. An external solver drives
/// it through [`Model::evaluate`], [`Model::initial_point`], and
/// [`Model::bound_constraints`].
///
/// Parameters, their counts by kind, the constraint row count, the initial
/// point, and the bounds are captured when the model is built. Changes to the
/// model data's parameters afterwards are not seen; build a new model instead.
///
/// Every model owns a data file holding its serialized [`ModelRecord`], for
/// workers that evaluate the model elsewhere. The file is removed by
/// [`Model::close`], or when the model is dropped.
#[derive(Debug)]
pub struct Model<D, S> {
    data: D,
    structure: S,
    config: Config,
    summary: ModelSummary,
    data_file: Option<DataFile>,
}

impl<D, S> Model<D, S>
where
    D: ModelData,
    S: ModelStructure + Serialize,
{
    /// Builds a model and writes its first data file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the model data declares no
    /// parameters, a parameter is malformed or declared twice, a constraint
    /// is malformed, or the data file cannot be written.
    pub fn new(data: D, structure: S, config: Config) -> Result<Self, ModelError> {
        config
            .validate()
            .map_err(|reason| ModelError::InvalidConfig { reason })?;

        let parameters = data.parameters();
        validate_parameters(&parameters)?;

        let m_con = structure
            .constraint_bounds()
            .iter()
            .enumerate()
            .try_fold(0, |total, (index, bounds)| {
                bounds
                    .size()
                    .map(|size| total + size)
                    .map_err(|source| ModelError::Constraint { index, source })
            })?;

        let summary = ModelSummary::new(parameters, m_con);
        tracing::info!(
            n_var = summary.n_var,
            n_real = summary.n_real,
            n_integer = summary.n_integer,
            n_binary = summary.n_binary,
            n_categorical = summary.n_categorical,
            m_con = summary.m_con,
            "initialized model"
        );

        let mut model = Self {
            data,
            structure,
            config,
            summary,
            data_file: None,
        };
        model.persist()?;

        Ok(model)
    }

    /// Writes the model to a fresh data file and removes the previous one.
    ///
    /// The previous file is only removed once the new one is written, so a
    /// failed call leaves the model with its old file.
    ///
    /// Returns the path of the new file.
    ///
    /// # Errors
    ///
    /// Returns an error if the new file cannot be created or written.
    pub fn persist(&mut self) -> Result<&Path, ModelError> {
        let record = RecordRef {
            summary: &self.summary,
            structure: &self.structure,
        };
        let file = DataFile::write(&record, &self.config)?;

        Ok(self.data_file.insert(file).path())
    }
}

impl<D, S> Model<D, S>
where
    D: ModelData,
    S: ModelStructure,
{
    /// Evaluates the model at `point`.
    ///
    /// `point` holds one value per parameter, in parameter order. The batch
    /// run is delegated to the model data and its result scored by the model
    /// structure. This call blocks until the run completes.
    ///
    /// Returns `Ok(None)` if the run itself failed. Solvers should treat such
    /// a point as unevaluated rather than abort.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Dimension`] if `point` has the wrong length, in
    /// which case nothing is run. Also returns an error if the structure
    /// fails to score a completed run.
    pub fn evaluate(&self, point: &[Value]) -> Result<Option<Evaluation>, ModelError> {
        if point.len() != self.summary.n_var {
            return Err(ModelError::Dimension {
                expected: self.summary.n_var,
                actual: point.len(),
            });
        }

        tracing::debug!("begin blackbox evaluation");

        let result = match self.data.run(point) {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(error = %error, "blackbox run failed");
                return Ok(None);
            }
        };

        let evaluation = self
            .structure
            .evaluate(&result)
            .map_err(|error| ModelError::Structure(Box::new(error)))?;

        if evaluation.constraints.len() != self.summary.m_con {
            return Err(ModelError::ConstraintCount {
                expected: self.summary.m_con,
                actual: evaluation.constraints.len(),
            });
        }

        tracing::debug!(objective = evaluation.objective, "end blackbox evaluation");
        Ok(Some(evaluation))
    }
}

impl<D, S> Model<D, S> {
    /// Removes the data file and releases the model.
    pub fn close(mut self) {
        tracing::debug!("closing model");
        self.data_file = None;
    }

    /// Returns the point the model data started from.
    #[must_use]
    pub fn initial_point(&self) -> &[Value] {
        &self.summary.initial_point
    }

    /// Returns the bound of each parameter, in parameter order.
    #[must_use]
    pub fn bound_constraints(&self) -> &[Bound] {
        &self.summary.bounds
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.summary.parameters
    }

    #[must_use]
    pub fn n_var(&self) -> usize {
        self.summary.n_var
    }

    #[must_use]
    pub fn n_real(&self) -> usize {
        self.summary.n_real
    }

    #[must_use]
    pub fn n_integer(&self) -> usize {
        self.summary.n_integer
    }

    #[must_use]
    pub fn n_binary(&self) -> usize {
        self.summary.n_binary
    }

    #[must_use]
    pub fn n_categorical(&self) -> usize {
        self.summary.n_categorical
    }

    #[must_use]
    pub fn m_con(&self) -> usize {
        self.summary.m_con
    }

    #[must_use]
    pub fn summary(&self) -> &ModelSummary {
        &self.summary
    }

    /// Returns the path of the current data file.
    #[must_use]
    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_ref().map(DataFile::path)
    }

    #[must_use]
    pub fn model_data(&self) -> &D {
        &self.data
    }

    #[must_use]
    pub fn model_structure(&self) -> &S {
        &self.structure
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn validate_parameters(parameters: &[Parameter]) -> Result<(), ModelError> {
    if parameters.is_empty() {
        return Err(ModelError::NoParameters);
    }

    let mut seen = HashSet::new();
    for param in parameters {
        param.validate()?;
        if !seen.insert(param.name()) {
            return Err(ModelError::DuplicateParameter {
                name: param.name().to_owned(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        cell::Cell,
        collections::HashMap,
        convert::Infallible,
        fmt,
        sync::Arc,
        thread,
    };

    use approx::assert_relative_eq;
    use opal_core::{MeasureRegistry, MeasureValueTable, ParameterError};

    use crate::{
        data::{Assignment, BatchData, TestResult},
        structure::{Aggregate, Constraint, Structure},
    };

    #[derive(Debug)]
    struct RunFailed;

    impl fmt::Display for RunFailed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "run exited with a non-zero status")
        }
    }

    impl std::error::Error for RunFailed {}

    /// Model data whose FEVAL on each problem is the sum of the numeric
    /// point entries, counting every run.
    struct SumData {
        parameters: Vec<Parameter>,
        fail: bool,
        runs: Cell<usize>,
    }

    impl SumData {
        fn new(parameters: Vec<Parameter>) -> Self {
            Self {
                parameters,
                fail: false,
                runs: Cell::new(0),
            }
        }

        fn failing(parameters: Vec<Parameter>) -> Self {
            Self {
                fail: true,
                ..Self::new(parameters)
            }
        }
    }

    impl ModelData for SumData {
        type Error = RunFailed;

        fn parameters(&self) -> Vec<Parameter> {
            self.parameters.clone()
        }

        fn run(&self, point: &[Value]) -> Result<TestResult, Self::Error> {
            self.runs.set(self.runs.get() + 1);
            if self.fail {
                return Err(RunFailed);
            }

            let total: f64 = point.iter().filter_map(Value::as_f64).sum();
            let table = MeasureValueTable::new(["P1", "P2"], ["FEVAL", "ECODE"]);
            for problem in ["P1", "P2"] {
                table
                    .add_problem_measures(
                        problem,
                        &HashMap::from([("FEVAL", total), ("ECODE", 0.0)]),
                    )
                    .expect("row is complete");
            }
            Ok(TestResult::new(point.to_vec(), Arc::new(table)))
        }
    }

    /// A structure that always reports one constraint value too many.
    #[derive(Serialize)]
    struct Miscounted;

    impl ModelStructure for Miscounted {
        type Error = Infallible;

        fn constraint_bounds(&self) -> Vec<crate::structure::ConstraintBounds> {
            Vec::new()
        }

        fn evaluate(&self, _result: &TestResult) -> Result<Evaluation, Self::Error> {
            Ok(Evaluation {
                objective: 0.0,
                constraints: vec![1.0],
            })
        }
    }

    /// An unconstrained structure whose serialization can be made to fail.
    struct Flaky {
        broken: Cell<bool>,
    }

    impl Serialize for Flaky {
        fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
        where
            Ser: serde::Serializer,
        {
            if self.broken.get() {
                return Err(serde::ser::Error::custom("structure is not serializable"));
            }
            serializer.serialize_unit_struct("Flaky")
        }
    }

    impl ModelStructure for Flaky {
        type Error = Infallible;

        fn constraint_bounds(&self) -> Vec<crate::structure::ConstraintBounds> {
            Vec::new()
        }

        fn evaluate(&self, _result: &TestResult) -> Result<Evaluation, Self::Error> {
            Ok(Evaluation {
                objective: 0.0,
                constraints: Vec::new(),
            })
        }
    }

    fn trunk_parameters() -> Vec<Parameter> {
        vec![
            Parameter::real("eta1", 0.25).with_bound(Bound::between(0.0, 1.0)),
            Parameter::real("eta2", 0.75).with_bound(Bound::between(0.0, 1.0)),
            Parameter::real("gamma1", 0.5),
            Parameter::integer("maxit", 100).with_bound(Bound::at_least(1.0)),
            Parameter::binary("precond", true),
        ]
    }

    fn feval_structure(registry: &MeasureRegistry) -> Structure {
        Structure::new(Aggregate::sum(&registry.create("FEVAL", None)))
    }

    #[test]
    fn snapshots_parameters() {
        let registry = MeasureRegistry::new();
        let model = Model::new(
            SumData::new(trunk_parameters()),
            feval_structure(&registry),
            Config::default(),
        )
        .expect("model builds");

        assert_eq!(model.n_var(), 5);
        assert_eq!(model.n_real(), 3);
        assert_eq!(model.n_integer(), 1);
        assert_eq!(model.n_binary(), 1);
        assert_eq!(model.n_categorical(), 0);
        assert_eq!(model.m_con(), 0);
        assert_eq!(
            model.initial_point(),
            [
                Value::Real(0.25),
                Value::Real(0.75),
                Value::Real(0.5),
                Value::Integer(100),
                Value::Binary(true),
            ]
        );
        assert_eq!(model.bound_constraints()[0], Bound::between(0.0, 1.0));
        assert_eq!(model.bound_constraints()[2], Bound::Unbounded);
    }

    #[test]
    fn counts_constraint_rows() {
        let registry = MeasureRegistry::new();
        let ecode = registry.create("ECODE", None);
        let structure = feval_structure(&registry)
            .with_constraint(Constraint::at_most(Aggregate::sum(&ecode), 0.0))
            .with_constraint(Constraint::between(Aggregate::max(&ecode), -1.0, 1.0));

        let model = Model::new(SumData::new(trunk_parameters()), structure, Config::default())
            .expect("model builds");

        assert_eq!(model.m_con(), 3);
    }

    #[test]
    fn evaluates_through_collaborators() {
        let registry = MeasureRegistry::new();
        let ecode = registry.create("ECODE", None);
        let structure = feval_structure(&registry)
            .with_constraint(Constraint::at_most(Aggregate::sum(&ecode), 0.0));
        let model = Model::new(SumData::new(trunk_parameters()), structure, Config::default())
            .expect("model builds");

        let evaluation = model
            .evaluate(model.initial_point())
            .expect("point has the right length")
            .expect("run succeeds");

        // Each of two problems reports 0.25 + 0.75 + 0.5 + 100 + 1.
        assert_relative_eq!(evaluation.objective, 2.0 * 102.5);
        assert_eq!(evaluation.constraints, [0.0]);
        assert_eq!(model.model_data().runs.get(), 1);
    }

    #[test]
    fn wrong_dimension_has_no_side_effects() {
        let registry = MeasureRegistry::new();
        let model = Model::new(
            SumData::new(trunk_parameters()),
            feval_structure(&registry),
            Config::default(),
        )
        .expect("model builds");
        let path = model.data_file().expect("model has a data file").to_path_buf();
        let contents = std::fs::read_to_string(&path).expect("data file is readable");

        let result = model.evaluate(&[Value::Real(0.5), Value::Real(0.5)]);

        assert!(matches!(
            result,
            Err(ModelError::Dimension {
                expected: 5,
                actual: 2
            })
        ));
        assert_eq!(model.model_data().runs.get(), 0);
        assert_eq!(model.data_file(), Some(path.as_path()));
        assert_eq!(
            std::fs::read_to_string(&path).expect("data file is readable"),
            contents
        );
    }

    #[test]
    fn failed_run_yields_none() {
        let registry = MeasureRegistry::new();
        let model = Model::new(
            SumData::failing(trunk_parameters()),
            feval_structure(&registry),
            Config::default(),
        )
        .expect("model builds");

        let outcome = model
            .evaluate(model.initial_point())
            .expect("a failed run is not an error");

        assert!(outcome.is_none());
        assert_eq!(model.model_data().runs.get(), 1);
    }

    #[test]
    fn structure_must_match_constraint_count() {
        let model = Model::new(
            SumData::new(trunk_parameters()),
            Miscounted,
            Config::default(),
        )
        .expect("model builds");

        let result = model.evaluate(model.initial_point());

        assert!(matches!(
            result,
            Err(ModelError::ConstraintCount {
                expected: 0,
                actual: 1
            })
        ));
    }

    #[test]
    fn rejects_empty_parameter_list() {
        let registry = MeasureRegistry::new();
        let result = Model::new(
            SumData::new(Vec::new()),
            feval_structure(&registry),
            Config::default(),
        );

        assert!(matches!(result, Err(ModelError::NoParameters)));
    }

    #[test]
    fn rejects_malformed_parameters() {
        let registry = MeasureRegistry::new();

        let duplicated = vec![Parameter::real("eta1", 0.1), Parameter::real("eta1", 0.2)];
        let result = Model::new(
            SumData::new(duplicated),
            feval_structure(&registry),
            Config::default(),
        );
        assert!(matches!(result, Err(ModelError::DuplicateParameter { .. })));

        let outside = vec![Parameter::real("eta1", 2.0).with_bound(Bound::between(0.0, 1.0))];
        let result = Model::new(
            SumData::new(outside),
            feval_structure(&registry),
            Config::default(),
        );
        assert!(matches!(
            result,
            Err(ModelError::Parameter(ParameterError::OutOfBound { .. }))
        ));
    }

    #[test]
    fn rejects_malformed_constraints() {
        let registry = MeasureRegistry::new();
        let ecode = registry.create("ECODE", None);
        let structure = feval_structure(&registry)
            .with_constraint(Constraint::at_most(Aggregate::sum(&ecode), 0.0))
            .with_constraint(Constraint::new(None, Aggregate::sum(&ecode), None));

        let result = Model::new(SumData::new(trunk_parameters()), structure, Config::default());

        assert!(matches!(
            result,
            Err(ModelError::Constraint { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let registry = MeasureRegistry::new();
        let config = Config {
            file_prefix: String::new(),
            ..Config::default()
        };

        let result = Model::new(
            SumData::new(trunk_parameters()),
            feval_structure(&registry),
            config,
        );

        assert!(matches!(result, Err(ModelError::InvalidConfig { .. })));
    }

    #[test]
    fn concurrent_evaluations_score_their_own_runs() {
        let problems: Vec<String> = (0..50).map(|i| format!("P{i}")).collect();
        let runner = |_: &str, assignment: &Assignment<'_>| {
            let x = assignment.real("x").unwrap_or_default();
            Ok::<_, Infallible>(HashMap::from([("FEVAL".to_owned(), x)]))
        };
        let data = BatchData::new(vec![Parameter::real("x", 1.0)], problems, ["FEVAL"], runner);

        let registry = MeasureRegistry::new();
        let model = Model::new(data, feval_structure(&registry), Config::default())
            .expect("model builds");

        thread::scope(|scope| {
            for t in 0..4_u32 {
                let model = &model;
                scope.spawn(move || {
                    let x = f64::from(t + 1);
                    for _ in 0..200 {
                        let evaluation = model
                            .evaluate(&[Value::Real(x)])
                            .expect("point has the right length")
                            .expect("run succeeds");
                        assert_relative_eq!(evaluation.objective, 50.0 * x);
                    }
                });
            }
        });
    }

    #[test]
    fn close_removes_data_file() {
        let registry = MeasureRegistry::new();
        let model = Model::new(
            SumData::new(trunk_parameters()),
            feval_structure(&registry),
            Config::default(),
        )
        .expect("model builds");
        let path = model.data_file().expect("model has a data file").to_path_buf();
        assert!(path.exists());

        model.close();

        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_data_file() {
        let registry = MeasureRegistry::new();
        let path = {
            let model = Model::new(
                SumData::new(trunk_parameters()),
                feval_structure(&registry),
                Config::default(),
            )
            .expect("model builds");
            model.data_file().expect("model has a data file").to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn persist_replaces_data_file() {
        let registry = MeasureRegistry::new();
        let mut model = Model::new(
            SumData::new(trunk_parameters()),
            feval_structure(&registry),
            Config::default(),
        )
        .expect("model builds");
        let first = model.data_file().expect("model has a data file").to_path_buf();

        let second = model.persist().expect("model persists").to_path_buf();

        assert_ne!(first, second);
        assert!(!first.exists());
        assert!(second.exists());
        assert_eq!(model.data_file(), Some(second.as_path()));
    }

    #[test]
    fn failed_persist_keeps_previous_file() {
        let dir = tempfile::tempdir().expect("scratch dir");
        let config = Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let structure = Flaky {
            broken: Cell::new(false),
        };
        let mut model =
            Model::new(SumData::new(trunk_parameters()), structure, config).expect("model builds");
        let first = model.data_file().expect("model has a data file").to_path_buf();
        let contents = std::fs::read_to_string(&first).expect("data file is readable");

        model.model_structure().broken.set(true);
        let result = model.persist();

        assert!(matches!(
            result,
            Err(ModelError::Persist(PersistError::Format(_)))
        ));
        assert_eq!(model.data_file(), Some(first.as_path()));
        assert_eq!(
            std::fs::read_to_string(&first).expect("data file is readable"),
            contents
        );
        assert_eq!(
            std::fs::read_dir(dir.path()).expect("dir is readable").count(),
            1
        );

        model.model_structure().broken.set(false);
        let second = model.persist().expect("model persists").to_path_buf();
        assert!(!first.exists());
        assert!(second.exists());
    }

    #[test]
    fn data_file_round_trips() {
        let registry = MeasureRegistry::new();
        let ecode = registry.create("ECODE", None);
        let structure = feval_structure(&registry)
            .with_constraint(Constraint::at_most(Aggregate::sum(&ecode), 0.0));
        let model = Model::new(SumData::new(trunk_parameters()), structure, Config::default())
            .expect("model builds");

        let mut record = ModelRecord::<Structure>::load(
            model.data_file().expect("model has a data file"),
        )
        .expect("record loads");

        assert_eq!(&record.summary, model.summary());
        assert_eq!(record.structure.constraints().len(), 1);
        assert!(!record.structure.objective().measure().ptr_eq(
            model.model_structure().objective().measure()
        ));

        record.reconcile(&registry);

        assert!(record.structure.objective().measure().ptr_eq(
            model.model_structure().objective().measure()
        ));
        assert!(record.structure.constraints()[0]
            .function()
            .measure()
            .ptr_eq(&ecode));
    }
}
