//! End-to-end CLI behaviour tests for `rez-bind-pypackage`.
//!
//! These scenarios invoke the binder binary and validate argument handling
//! and error reporting. Network access is confined to a closed local port.

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::process::{Command, Output};
use tempfile::TempDir;

#[derive(Default)]
struct CliWorld {
    args: Vec<String>,
    config_args: Vec<String>,
    install_path: Option<Utf8PathBuf>,
    output: Option<Output>,
    // Keep temp_dir alive for the lifetime of the scenario.
    _temp_dir: Option<TempDir>,
}

#[fixture]
fn cli_world() -> CliWorld {
    CliWorld::default()
}

fn get_output(cli_world: &CliWorld) -> &Output {
    cli_world.output.as_ref().expect("output not set")
}

fn combined_output(cli_world: &CliWorld) -> String {
    let output = get_output(cli_world);
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[given("the binder is invoked with \"{args}\"")]
fn given_args(cli_world: &mut CliWorld, args: String) {
    cli_world.args = args.split_whitespace().map(str::to_owned).collect();
}

#[given("the binder is invoked without arguments")]
fn given_no_args(cli_world: &mut CliWorld) {
    cli_world.args.clear();
}

#[given("the binder is configured to use an unreachable index")]
fn given_unreachable_index(cli_world: &mut CliWorld) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let base = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).expect("UTF-8 path");
    let install_path = base.join("packages");
    let config = format!(
        "index_url = \"http://127.0.0.1:1/pypi\"\nscratch_dir = \"{}\"\ninstall_path = \"{install_path}\"\ntimeout_secs = 5\n",
        base.join("scratch"),
    );
    let config_path = base.join("rezbind.toml");
    std::fs::write(&config_path, config).expect("write config");

    cli_world.config_args = vec!["--config".to_owned(), config_path.into_string()];
    cli_world.install_path = Some(install_path);
    cli_world._temp_dir = Some(temp_dir);
}

#[when("the binder CLI is run")]
fn when_cli_run(cli_world: &mut CliWorld) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rez-bind-pypackage"));
    cmd.args(&cli_world.args);
    cmd.args(&cli_world.config_args);
    cmd.env_remove("REZBIND_CONFIG");
    cmd.env_remove("RUST_LOG");

    let output = cmd.output().expect("failed to run rez-bind-pypackage");
    cli_world.output = Some(output);
}

#[then("the CLI exits successfully")]
fn then_cli_exits_successfully(cli_world: &mut CliWorld) {
    let output = get_output(cli_world);
    assert!(
        output.status.success(),
        "expected success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[then("the CLI exits with an error")]
fn then_cli_exits_with_error(cli_world: &mut CliWorld) {
    let output = get_output(cli_world);
    assert!(
        !output.status.success(),
        "expected failure, stdout: {}, stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[then("the output mentions \"{text}\"")]
fn then_output_mentions(cli_world: &mut CliWorld, text: String) {
    let combined = combined_output(cli_world);
    assert!(combined.contains(&text), "expected {text:?} in output: {combined}");
}

#[then("no package is written")]
fn then_no_package(cli_world: &mut CliWorld) {
    let install_path = cli_world.install_path.as_ref().expect("install path set");
    assert!(
        !install_path.join("examplepkg").exists(),
        "no package should be written under {install_path}"
    );
}

#[scenario(path = "tests/features/cli.feature", name = "Help lists the package option")]
fn scenario_help(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", name = "The package option is required")]
fn scenario_requires_pypkg(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", name = "A malformed range is rejected")]
fn scenario_malformed_range(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(path = "tests/features/cli.feature", name = "An unreachable index fails the bind")]
fn scenario_unreachable_index(cli_world: CliWorld) {
    let _ = cli_world;
}

#[scenario(
    path = "tests/features/cli.feature",
    name = "A package name that leaves the repository is rejected"
)]
fn scenario_escaping_name(cli_world: CliWorld) {
    let _ = cli_world;
}
