//! Conformance Test Runner
//!
//! Command-line front end: discovers fixtures under the given roots, runs
//! them against an engine binary and prints a summary followed by every
//! non-passing fixture in discovery order.
//!
//! Exit codes: 0 when every selected fixture passed, 1 when any failed,
//! errored or timed out, 2 when the harness could not run at all.

use clap::Parser;
use conformance_harness::cli::{EXIT_SETUP_ERROR, EXIT_SUCCESS};
use conformance_harness::{
    logging, Cli, ConformanceHarness, FixtureLoader, HarnessConfig, HarnessError, HarnessResult,
    HostEngine, IncludeTable, TestReport,
};
use std::process;
use std::time::Instant;
use tracing::error;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let code = match cli.to_config().and_then(|config| run(&config)) {
        Ok(report) => report.exit_code(),
        Err(e) => {
            error!(error = %e, "harness setup failed");
            eprintln!("Error: {}", e);
            EXIT_SETUP_ERROR
        }
    };

    if code != EXIT_SUCCESS {
        process::exit(code);
    }
}

fn run(config: &HarnessConfig) -> HarnessResult<TestReport> {
    let mut includes = IncludeTable::bundled();
    if let Some(dir) = &config.includes_dir {
        includes = includes.with_dir(dir)?;
    }

    let loader =
        FixtureLoader::new(config.roots.iter().cloned(), includes).with_selection(config.selection.clone());
    let engine = HostEngine::new(config.host.clone())?;

    let mut harness = ConformanceHarness::new(engine)
        .with_timeout(config.timeout())
        .with_strict_variants(config.strict_variants);
    if let Some(workers) = config.workers {
        harness = harness.with_workers(workers);
    }

    let start = Instant::now();
    let report = harness.run(&loader)?;
    let duration = start.elapsed();

    println!("{}", report.detailed_summary());
    println!("Duration: {:.2}s", duration.as_secs_f64());

    if let Some(path) = &config.json_report {
        std::fs::write(path, report.to_json()?).map_err(|e| HarnessError::io(path, e))?;
    }

    Ok(report)
}
