//! A coordinate probe over the real parameters of a model.
//!
//! Each round tries a step up and down along every real coordinate, keeps
//! any feasible improvement, and halves the step when a round finds none.
//! Failed evaluations are skipped.

use opal_core::{Bound, Value};
use opal_model::{Evaluation, Model, ModelData, ModelError, ModelStructure};

/// Settings for [`probe`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Initial step as a fraction of each coordinate's bound width.
    pub step: f64,
    /// Maximum number of black-box evaluations.
    pub max_evals: usize,
    /// The probe stops once the step drops below this fraction.
    pub min_step: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step: 0.25,
            max_evals: 60,
            min_step: 1e-3,
        }
    }
}

/// The best point found by [`probe`].
#[derive(Debug, Clone)]
pub struct Best {
    pub point: Vec<Value>,
    pub evaluation: Evaluation,
    pub evals: usize,
}

/// Probes `model` starting from `start`.
///
/// Returns `None` if no evaluated point was feasible.
///
/// # Errors
///
/// Returns an error if the model rejects a point or fails to score a run.
pub fn probe<D, S>(
    model: &Model<D, S>,
    start: &[Value],
    config: &Config,
) -> Result<Option<Best>, ModelError>
where
    D: ModelData,
    S: ModelStructure,
{
    let mut evals = 1;
    let mut best = model
        .evaluate(start)?
        .filter(is_feasible)
        .map(|evaluation| (start.to_vec(), evaluation));

    let mut step = config.step;
    while step >= config.min_step && evals < config.max_evals {
        let mut improved = false;

        for (index, bound) in model.bound_constraints().iter().enumerate() {
            let Some((point, evaluation)) = best.as_ref() else {
                break;
            };
            let Value::Real(x) = point[index] else {
                continue;
            };
            let width = interval_width(bound);
            let incumbent = evaluation.objective;

            for candidate in [x + step * width, x - step * width] {
                if evals >= config.max_evals {
                    break;
                }
                let candidate = Value::Real(candidate);
                if !bound.contains(&candidate) {
                    continue;
                }

                let mut trial = point.clone();
                trial[index] = candidate;
                evals += 1;

                if let Some(evaluation) = model.evaluate(&trial)? {
                    if is_feasible(&evaluation) && evaluation.objective < incumbent {
                        tracing::debug!(objective = evaluation.objective, evals, "probe improved");
                        best = Some((trial, evaluation));
                        improved = true;
                        break;
                    }
                }
            }
        }

        if !improved {
            step *= 0.5;
        }
    }

    Ok(best.map(|(point, evaluation)| Best {
        point,
        evaluation,
        evals,
    }))
}

fn is_feasible(evaluation: &Evaluation) -> bool {
    evaluation.constraints.iter().all(|&c| c <= 0.0)
}

fn interval_width(bound: &Bound) -> f64 {
    match bound {
        Bound::Interval {
            lower: Some(lower),
            upper: Some(upper),
        } => upper - lower,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use opal_core::MeasureRegistry;
    use opal_model::{Aggregate, Config as ModelConfig, Structure};

    use crate::trunk;

    #[test]
    fn improves_on_the_initial_point() {
        let registry = MeasureRegistry::new();
        let feval = registry.create("FEVAL", None);
        let model = Model::new(
            trunk::model_data(&trunk::ACTIVE, &trunk::PROBLEMS[..4]),
            Structure::new(Aggregate::sum(&feval)),
            ModelConfig::default(),
        )
        .expect("model builds");

        let initial = model
            .evaluate(model.initial_point())
            .expect("point has the right length")
            .expect("defaults run");
        let best = probe(&model, model.initial_point(), &Config::default())
            .expect("probe runs")
            .expect("defaults are feasible");

        assert!(best.evaluation.objective < initial.objective);
        assert!(best.evals <= Config::default().max_evals);
        model.close();
    }

    #[test]
    fn infeasible_start_yields_nothing() {
        let registry = MeasureRegistry::new();
        let feval = registry.create("FEVAL", None);
        let model = Model::new(
            trunk::model_data(&["eta1", "eta2"], &["WOODS"]),
            Structure::new(Aggregate::sum(&feval)),
            ModelConfig::default(),
        )
        .expect("model builds");

        let start = [Value::Real(0.9), Value::Real(0.1)];
        let best = probe(&model, &start, &Config::default()).expect("probe runs");

        assert!(best.is_none());
    }
}
