//! Unit tests for command-line parsing and configuration

use clap::Parser;
use conformance_harness::{Cli, HarnessConfig, HarnessError};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("run_conformance").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_defaults() {
    let config = parse(&["test262/test"]).to_config().unwrap();

    assert_eq!(config.roots, vec![PathBuf::from("test262/test")]);
    assert_eq!(config.host.program, "node");
    assert_eq!(config.host.check_args, Some(vec!["--check".to_string()]));
    assert_eq!(config.timeout(), Duration::from_secs(10));
    assert_eq!(config.workers, None);
    assert!(config.strict_variants);
    assert!(config.json_report.is_none());
}

#[test]
fn test_flags_override_defaults() {
    let cli = parse(&[
        "a",
        "b",
        "--host",
        "d8",
        "--host-arg",
        "--harmony",
        "--check-arg",
        "--parse-only",
        "--feature",
        "BigInt",
        "--feature",
        "Atomics",
        "--exclude-feature",
        "Temporal",
        "--flag",
        "module",
        "--filter",
        "built-ins/",
        "-j",
        "4",
        "--timeout-ms",
        "2500",
        "--no-strict-variants",
        "--json",
        "out.json",
    ]);
    let config = cli.to_config().unwrap();

    assert_eq!(config.roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
    assert_eq!(config.host.program, "d8");
    assert_eq!(config.host.args, vec!["--harmony"]);
    assert_eq!(config.host.check_args, Some(vec!["--parse-only".to_string()]));
    assert_eq!(config.selection.features, vec!["BigInt", "Atomics"]);
    assert_eq!(config.selection.exclude_features, vec!["Temporal"]);
    assert_eq!(config.selection.flags, vec!["module"]);
    assert_eq!(config.selection.path_filter.as_deref(), Some("built-ins/"));
    assert_eq!(config.workers, Some(4));
    assert_eq!(config.timeout(), Duration::from_millis(2500));
    assert!(!config.strict_variants);
    assert_eq!(config.json_report, Some(PathBuf::from("out.json")));
}

#[test]
fn test_no_check_disables_phase_check() {
    let config = parse(&["t", "--no-check"]).to_config().unwrap();
    assert_eq!(config.host.check_args, None);
}

#[test]
fn test_no_check_conflicts_with_check_arg() {
    let result = Cli::try_parse_from(["run_conformance", "t", "--no-check", "--check-arg", "-c"]);
    assert!(result.is_err());
}

#[test]
fn test_verbosity_count() {
    let cli = parse(&["t", "-vv", "-q"]);
    assert_eq!(cli.verbose, 2);
    assert!(cli.quiet);
}

#[test]
fn test_missing_roots_is_setup_error() {
    let err = parse(&[]).to_config().unwrap_err();
    assert!(matches!(err, HarnessError::Config(_)));
    assert!(err.is_setup_error());
}

#[test]
fn test_zero_workers_rejected() {
    let err = parse(&["t", "-j", "0"]).to_config().unwrap_err();
    assert!(err.to_string().contains("worker"));
}

#[test]
fn test_zero_timeout_rejected() {
    let err = parse(&["t", "--timeout-ms", "0"]).to_config().unwrap_err();
    assert!(matches!(err, HarnessError::Config(_)));
}

#[test]
fn test_config_file_with_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("harness.yaml");
    fs::write(
        &path,
        r#"
roots: [suite/a, suite/b]
includes_dir: vendor/harness
host:
  program: qjs
  args: [--std]
  check_args: null
workers: 2
timeout_ms: 3000
selection:
  exclude_features: [SharedArrayBuffer]
strict_variants: false
"#,
    )
    .unwrap();

    let config = parse(&["-c", path.to_str().unwrap(), "-j", "8"])
        .to_config()
        .unwrap();

    assert_eq!(
        config.roots,
        vec![PathBuf::from("suite/a"), PathBuf::from("suite/b")]
    );
    assert_eq!(config.includes_dir, Some(PathBuf::from("vendor/harness")));
    assert_eq!(config.host.program, "qjs");
    assert_eq!(config.host.args, vec!["--std"]);
    assert_eq!(config.host.check_args, None);
    assert_eq!(config.workers, Some(8));
    assert_eq!(config.timeout_ms, 3000);
    assert_eq!(config.selection.exclude_features, vec!["SharedArrayBuffer"]);
    assert!(!config.strict_variants);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = parse(&["-c", "/nonexistent/harness.yaml", "t"])
        .to_config()
        .unwrap_err();
    assert!(matches!(err, HarnessError::Io { .. }));
}

#[test]
fn test_invalid_config_yaml() {
    let err = HarnessConfig::from_yaml("roots: {unclosed").unwrap_err();
    assert!(matches!(err, HarnessError::Yaml(_)));
}

#[test]
fn test_default_config_round_trips_through_yaml() {
    let config = HarnessConfig::default();
    let text = serde_yaml::to_string(&config).unwrap();
    assert_eq!(HarnessConfig::from_yaml(&text).unwrap(), config);
}
