//! # Tuning TRUNK on a CUTEr subset
//!
//! Tunes the five trust-region parameters of the synthetic TRUNK solver to
//! minimize the total number of function evaluations over a problem set.
//! The model is unconstrained.
//!
//! ## Running the Example
//!
//! ```sh
//! RUST_LOG=opal_model=debug cargo run --example trunk_optimize
//! ```

use opal_core::{MeasureKind, MeasureRegistry};
use opal_examples::{init_tracing, probe, trunk};
use opal_model::{Aggregate, Config, Model, Structure};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let registry = MeasureRegistry::new();
    let feval = registry.create("FEVAL", Some(MeasureKind::Integer));

    let data = trunk::model_data(&trunk::ACTIVE, &trunk::PROBLEMS);
    let structure = Structure::new(Aggregate::sum(&feval));
    let model = Model::new(data, structure, Config::default())?;

    if let Some(path) = model.data_file() {
        tracing::info!(path = %path.display(), "model written");
    }

    let config = probe::Config {
        max_evals: 10,
        ..probe::Config::default()
    };
    match probe::probe(&model, model.initial_point(), &config)? {
        Some(best) => {
            for (param, value) in model.parameters().iter().zip(&best.point) {
                println!("{:>8} = {value:?}", param.name());
            }
            println!(
                "total FEVAL = {} after {} evaluations",
                best.evaluation.objective, best.evals
            );
        }
        None => println!("no successful evaluation"),
    }

    model.close();
    Ok(())
}
