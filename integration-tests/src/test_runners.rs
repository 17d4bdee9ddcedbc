//! Runners with scripted results, used across the integration tests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use opal_model::{Assignment, Runner};
use thiserror::Error;

/// A run that exited abnormally.
#[derive(Debug, Error)]
#[error("solver exited with status {status} on `{problem}`")]
pub struct ExitStatus {
    pub problem: String,
    pub status: i32,
}

/// Reports `FEVAL` and `ECODE` for each problem from a fixed script.
///
/// `FEVAL` is the scripted base count scaled by `1 + x` where `x` is the
/// value of the `scale` parameter. Problems listed in `crashes` fail with a
/// non-zero exit status.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    pub base: HashMap<String, (f64, f64)>,
    pub crashes: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new<'a>(script: impl IntoIterator<Item = (&'a str, f64, f64)>) -> Self {
        Self {
            base: script
                .into_iter()
                .map(|(problem, feval, ecode)| (problem.to_owned(), (feval, ecode)))
                .collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn crashing_on(mut self, problem: &str) -> Self {
        self.crashes.push(problem.to_owned());
        self
    }

    /// Number of problem runs so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Runner for ScriptedRunner {
    type Error = ExitStatus;

    fn run_problem(
        &self,
        problem: &str,
        assignment: &Assignment<'_>,
    ) -> Result<HashMap<String, f64>, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.crashes.iter().any(|name| name == problem) {
            return Err(ExitStatus {
                problem: problem.to_owned(),
                status: 139,
            });
        }

        let (feval, ecode) = self.base.get(problem).copied().ok_or_else(|| ExitStatus {
            problem: problem.to_owned(),
            status: 1,
        })?;
        let scale = 1.0 + assignment.real("scale").unwrap_or_default();

        Ok(HashMap::from([
            ("FEVAL".to_owned(), feval * scale),
            ("ECODE".to_owned(), ecode),
        ]))
    }
}
