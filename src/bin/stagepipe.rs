use std::error::Error;

use sarge::prelude::*;
use stagepipe::cli::{SpecArg, load_config, log_filter};
use stagepipe::{PipeConfig, builtin_registry, run_config};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  stagepipe --spec <pipeline> [--log <filter>]");
    eprintln!("  stagepipe --config <file.yaml> [--spec <pipeline>] [--log <filter>]");
    eprintln!();
    eprintln!("Pipeline:");
    eprintln!("  <text>             Inline specification, e.g. \"literal hi | console\"");
    eprintln!("  @<path>            Read the specification from a file");
    eprintln!();
    eprintln!("Stages: literal, console, hole, take, fanout, faninany");
}

/// Bad or missing command line arguments.
#[derive(Debug)]
struct UsageError(String);

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for UsageError {}

fn init_logging(filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut reader = ArgumentReader::new();

    let spec_ref = reader.add::<SpecArg>(tag::both('s', "spec"));
    let config_ref = reader.add::<String>(tag::both('c', "config"));
    let log_ref = reader.add::<String>(tag::long("log"));

    let args = reader.parse().map_err(|e| UsageError(e.to_string()))?;

    let spec = match spec_ref.get(&args) {
        Some(Ok(v)) => Some(v),
        Some(Err(_)) => unreachable!("SpecArg parsing is infallible"),
        None => None,
    };
    let config_path = config_ref.get(&args).and_then(Result::ok);
    let log_flag = log_ref.get(&args).and_then(Result::ok);

    let mut config = match config_path {
        Some(path) => Some(load_config(path)?),
        None => None,
    };

    init_logging(&log_filter(log_flag.as_deref(), config.as_ref()));

    // An explicit --spec overrides the pipeline of the config file.
    if let Some(spec) = spec {
        let text = spec.resolve()?;
        config = Some(match config {
            Some(mut cfg) => {
                cfg.pipeline = text;
                cfg
            }
            None => PipeConfig::new(text),
        });
    }

    let config = config.ok_or_else(|| UsageError("missing --spec or --config".into()))?;
    tracing::debug!(pipeline = %config.pipeline, "running pipeline");

    run_config(&config, &builtin_registry())?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("stagepipe error: {e}");
        if e.is::<UsageError>() {
            print_usage();
        }
        std::process::exit(1);
    }
}
