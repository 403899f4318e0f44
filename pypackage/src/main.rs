//! Python package index binder CLI entrypoint.
//!
//! This binary binds one release from a Python package index into the rez
//! package repository and reports where the package was written.

use clap::Parser;
use rezbind::BindConfig;
use rezbind_pypackage::bind::{BindOutcome, bind};
use rezbind_pypackage::cli::Cli;
use rezbind_pypackage::error::Result;
use rezbind_pypackage::output::{success_message, write_stderr_line};
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

// RUST_LOG takes precedence over the -v/-q flags.
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<BindOutcome> {
    let config = load_config(cli)?;
    let request = cli.request()?;
    let outcome = bind(&request, &config, stderr)?;

    if !cli.quiet {
        write_stderr_line(stderr, "");
    }
    write_stderr_line(stderr, success_message(&outcome));
    Ok(outcome)
}

/// Loads the configuration file and layers command-line overrides on top.
fn load_config(cli: &Cli) -> Result<BindConfig> {
    let mut config = match &cli.config {
        Some(path) => BindConfig::load_from(path)?,
        None => BindConfig::load()?,
    };
    cli.apply_to(&mut config);
    Ok(config)
}

fn exit_code_for_run_result(result: Result<BindOutcome>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}
