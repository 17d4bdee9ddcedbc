//! A synthetic stand-in for the TRUNK trust-region solver.
//!
//! The runner does not solve anything. It maps a parameter point and a
//! problem name to deterministic evaluation counts that are smallest near a
//! known sweet spot, which is enough to exercise a tuning run end to end.

use std::collections::HashMap;

use opal_core::{Bound, Parameter};
use opal_model::{Assignment, BatchData, Runner};
use thiserror::Error;

/// Measures reported by every run.
pub const MEASURES: [&str; 3] = ["FEVAL", "HEVAL", "ECODE"];

/// Parameters tuned in the examples.
pub const ACTIVE: [&str; 5] = ["eta1", "eta2", "gamma1", "gamma2", "gamma3"];

/// Problems of the unconstrained CUTEr subset used in the examples.
pub const PROBLEMS: [&str; 12] = [
    "BDQRTIC", "BROYDN7D", "BRYBND", "HIELOW", "POWER", "SENSORS", "SINQUAD", "TESTQUAD",
    "TRIDIA", "WOODS", "GENROSE", "NONDQUAR",
];

/// Every parameter of the solver with its default value and domain.
#[must_use]
pub fn parameters() -> Vec<Parameter> {
    vec![
        Parameter::real("eta1", 0.25).with_bound(Bound::between(0.0, 1.0)),
        Parameter::real("eta2", 0.75).with_bound(Bound::between(0.0, 1.0)),
        Parameter::real("gamma1", 0.5).with_bound(Bound::between(0.0, 1.0)),
        Parameter::real("gamma2", 1.0).with_bound(Bound::between(0.5, 1.0)),
        Parameter::real("gamma3", 2.0).with_bound(Bound::between(1.0, 10.0)),
        Parameter::integer("maxit", 1000).with_bound(Bound::at_least(1.0)),
        Parameter::binary("precond", false),
        Parameter::categorical("norm", "l2", ["l2", "linf"]),
    ]
}

/// The declared parameters whose names are in `names`, in declaration order.
#[must_use]
pub fn active(names: &[&str]) -> Vec<Parameter> {
    parameters()
        .into_iter()
        .filter(|param| names.contains(&param.name()))
        .collect()
}

/// Failures of a synthetic run.
#[derive(Debug, Error)]
pub enum TrunkError {
    #[error("run of `{problem}` diverged: eta1 = {eta1} is not below eta2 = {eta2}")]
    Diverged { problem: String, eta1: f64, eta2: f64 },
}

/// Runs the synthetic solver on one problem.
///
/// Parameters absent from the point take their declared defaults.
#[derive(Debug, Clone)]
pub struct TrunkRunner {
    defaults: Vec<Parameter>,
}

impl Default for TrunkRunner {
    fn default() -> Self {
        Self {
            defaults: parameters(),
        }
    }
}

impl TrunkRunner {
    fn value(&self, assignment: &Assignment<'_>, name: &str) -> f64 {
        assignment
            .real(name)
            .or_else(|| {
                self.defaults
                    .iter()
                    .find(|param| param.name() == name)
                    .and_then(|param| param.value().as_f64())
            })
            .unwrap_or_default()
    }
}

impl Runner for TrunkRunner {
    type Error = TrunkError;

    fn run_problem(
        &self,
        problem: &str,
        assignment: &Assignment<'_>,
    ) -> Result<HashMap<String, f64>, Self::Error> {
        let eta1 = self.value(assignment, "eta1");
        let eta2 = self.value(assignment, "eta2");
        if eta1 >= eta2 {
            return Err(TrunkError::Diverged {
                problem: problem.to_owned(),
                eta1,
                eta2,
            });
        }

        let gamma1 = self.value(assignment, "gamma1");
        let gamma2 = self.value(assignment, "gamma2");
        let gamma3 = self.value(assignment, "gamma3");

        let penalty = (eta1 - 0.1).powi(2)
            + (eta2 - 0.9).powi(2)
            + (gamma1 - 0.3).powi(2)
            + (gamma2 - 0.8).powi(2)
            + ((gamma3 - 4.0) / 4.0).powi(2);

        let feval = (difficulty(problem) * (1.0 + 4.0 * penalty)).round();
        let heval = (0.8 * feval).round();
        let ecode = if penalty > 0.5 { 1.0 } else { 0.0 };

        Ok(HashMap::from([
            ("FEVAL".to_owned(), feval),
            ("HEVAL".to_owned(), heval),
            ("ECODE".to_owned(), ecode),
        ]))
    }
}

/// Model data running the synthetic solver over `problems` with `active`
/// parameters.
#[must_use]
pub fn model_data(active: &[&str], problems: &[&str]) -> BatchData<TrunkRunner> {
    BatchData::new(
        self::active(active),
        problems.iter().copied(),
        MEASURES,
        TrunkRunner::default(),
    )
}

/// Baseline evaluation count of a problem, derived from its name.
fn difficulty(problem: &str) -> f64 {
    let hash = problem
        .bytes()
        .fold(0_u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(u32::from(byte)));
    f64::from(20 + hash % 80)
}
