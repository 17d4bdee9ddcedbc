//! # Tuning TRUNK with a surrogate
//!
//! Minimizes the total number of Hessian evaluations subject to every run
//! succeeding (the sum of error codes must not be positive). A surrogate
//! model over three problems screens candidate points cheaply; the best
//! surrogate point is then checked against the full model.
//!
//! ## Running the Example
//!
//! ```sh
//! cargo run --example trunk_surrogate
//! ```

use opal_core::{MeasureKind, MeasureRegistry};
use opal_examples::{init_tracing, probe, trunk};
use opal_model::{Aggregate, Config, Constraint, Model, Structure};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let registry = MeasureRegistry::new();
    let heval = registry.create("HEVAL", Some(MeasureKind::Integer));
    let ecode = registry.create("ECODE", Some(MeasureKind::Integer));

    let model = Model::new(
        trunk::model_data(&trunk::ACTIVE, &trunk::PROBLEMS),
        Structure::new(Aggregate::sum(&heval))
            .with_constraint(Constraint::at_most(Aggregate::sum(&ecode), 0.0)),
        Config::default(),
    )?;

    let surrogate = Model::new(
        trunk::model_data(&trunk::ACTIVE, &trunk::PROBLEMS[..3]),
        Structure::new(Aggregate::sum(&heval)),
        Config {
            file_prefix: "surrogate".to_owned(),
            ..Config::default()
        },
    )?;

    let start = surrogate.initial_point();
    let Some(screened) = probe::probe(&surrogate, start, &probe::Config::default())? else {
        println!("surrogate found no successful point");
        return Ok(());
    };
    println!(
        "surrogate HEVAL = {} after {} evaluations",
        screened.evaluation.objective, screened.evals
    );

    match model.evaluate(&screened.point)? {
        Some(evaluation) => println!(
            "full HEVAL = {}, constraints = {:?}",
            evaluation.objective, evaluation.constraints
        ),
        None => println!("full model run failed at the surrogate point"),
    }

    surrogate.close();
    model.close();
    Ok(())
}
