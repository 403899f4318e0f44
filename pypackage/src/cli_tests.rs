//! Tests for binder CLI parsing and configuration overrides.

use super::*;
use rstest::rstest;

fn parse(args: &[&str]) -> Cli {
    let argv = std::iter::once("rez-bind-pypackage").chain(args.iter().copied());
    Cli::parse_from(argv)
}

#[test]
fn cli_parses_defaults() {
    let cli = parse(&["--pypkg", "arrow"]);
    assert_eq!(cli.pypkg, "arrow");
    assert!(cli.name.is_none());
    assert!(cli.version.is_none());
    assert!(cli.range.is_none());
    assert!(cli.install_path.is_none());
    assert!(cli.config.is_none());
    assert!(!cli.keep_scratch);
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
}

#[test]
fn cli_requires_pypkg() {
    let result = Cli::try_parse_from(["rez-bind-pypackage"]);
    assert!(result.is_err());
}

#[test]
fn cli_parses_all_options() {
    let cli = parse(&[
        "--pypkg",
        "python-dateutil",
        "--name",
        "dateutil",
        "--version",
        "2.8.2",
        "--range",
        "2+<3",
        "--install-path",
        "/repo",
        "--config",
        "/etc/rezbind.toml",
        "--keep-scratch",
    ]);
    assert_eq!(cli.name.as_deref(), Some("dateutil"));
    assert_eq!(cli.version.as_deref(), Some("2.8.2"));
    assert_eq!(cli.range.as_deref(), Some("2+<3"));
    assert_eq!(cli.install_path, Some(Utf8PathBuf::from("/repo")));
    assert_eq!(cli.config, Some(Utf8PathBuf::from("/etc/rezbind.toml")));
    assert!(cli.keep_scratch);
}

#[test]
fn cli_rejects_quiet_with_verbose() {
    let result = Cli::try_parse_from(["rez-bind-pypackage", "--pypkg", "a", "-q", "-v"]);
    assert!(result.is_err());
}

#[rstest]
#[case::quiet(&["-q"], "error")]
#[case::default(&[], "warn")]
#[case::verbose(&["-v"], "info")]
#[case::very_verbose(&["-vv"], "debug")]
#[case::trace(&["-vvv"], "trace")]
fn log_level_follows_verbosity(#[case] flags: &[&str], #[case] expected: &str) {
    let mut args = vec!["--pypkg", "arrow"];
    args.extend_from_slice(flags);
    assert_eq!(parse(&args).log_level(), expected);
}

#[test]
fn request_carries_selection_arguments() {
    let cli = parse(&["--pypkg", "arrow", "--version", "0.4.4", "--range", "0.4+", "-q"]);
    let request = cli.request().expect("valid range");
    assert_eq!(request.pypkg, "arrow");
    assert_eq!(request.version.as_deref(), Some("0.4.4"));
    assert_eq!(request.range.map(|r| r.to_string()).as_deref(), Some("0.4+"));
    assert!(request.quiet);
}

#[test]
fn request_rejects_malformed_range() {
    let cli = parse(&["--pypkg", "arrow", "--range", "1<2"]);
    assert!(cli.request().is_err());
}

#[test]
fn overrides_replace_configured_values() {
    let mut config = BindConfig {
        install_path: Utf8PathBuf::from("/configured"),
        ..BindConfig::default()
    };
    parse(&["--pypkg", "arrow", "--install-path", "/flag"]).apply_to(&mut config);
    assert_eq!(config.install_path, Utf8PathBuf::from("/flag"));
}

#[test]
fn absent_flags_keep_configured_values() {
    let mut config = BindConfig {
        install_path: Utf8PathBuf::from("/configured"),
        keep_scratch: true,
        ..BindConfig::default()
    };
    parse(&["--pypkg", "arrow"]).apply_to(&mut config);
    assert_eq!(config.install_path, Utf8PathBuf::from("/configured"));
    assert!(config.keep_scratch);
}
