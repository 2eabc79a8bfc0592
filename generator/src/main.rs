use registry::catalog::Catalog;
use registry::Registry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::{env, fs, io};
use thiserror::Error;
use tracing::{debug, error, warn};
use vklite_generator::emit::Generator;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    Registry(#[from] registry::Error),
    #[error("cannot open output {}: {source}", path.display())]
    Output {
        path: PathBuf,
        source: io::Error,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let mut args = env::args().skip(1);
    let (Some(input), Some(output), None) = (args.next(), args.next(), args.next()) else {
        eprintln!("usage: vklite-generator <input.bin> <output.hpp>");
        return ExitCode::FAILURE;
    };
    match run(&input, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(input: &str, output: &str) -> Result<(), MainError> {
    let registry = Registry::load(input)?;
    let mut catalog = registry.catalog();
    catalog.process();
    let sorted = catalog.sort_types();
    report_cycles(&catalog, sorted);

    let mut text = String::new();
    Generator::new(&catalog)
        .generate(&mut text)
        .expect("formatting into a String does not fail");
    debug!(bytes = text.len(), "emitting header");
    fs::write(output, text).map_err(|source| MainError::Output {
        path: PathBuf::from(output),
        source,
    })?;
    Ok(())
}

/// Names each cyclic type left unsorted, with the back-edges that keep it
/// in the cycle. Emission proceeds on the partial order regardless.
fn report_cycles(catalog: &Catalog, sorted: usize) {
    for &id in &catalog.type_ids[sorted..] {
        let name = catalog.type_name(id);
        warn!("cyclic type dependency: {name}");
        for &other in &catalog.type_ids[sorted..] {
            let from = catalog.type_name(other);
            if catalog.deps.contains(from, name) {
                warn!("  <- {from}");
            }
        }
    }
}
