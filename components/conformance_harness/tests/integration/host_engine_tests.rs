//! Host engine tests driven through `sh`
//!
//! `sh -n` stands in for a syntax-only check and `sh` for the engine itself.
//! The check wraps `sh -n` so a rejected script reports a `SyntaxError` line.
//! Fixtures are flagged `raw` so no JavaScript helpers are staged ahead of the
//! shell body; the front-matter lines run as unknown commands and are harmless.

#![cfg(unix)]

use crate::common::fixture_source;
use conformance_harness::{
    ConformanceHarness, Engine, FixtureLoader, Fragment, HarnessError, HostConfig, HostEngine,
    IncludeTable, Verdict,
};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn sh_config() -> HostConfig {
    HostConfig {
        program: "sh".to_string(),
        args: Vec::new(),
        check_args: Some(vec![
            "-c".to_string(),
            "sh -n \"$0\" || { echo 'SyntaxError: shell syntax check failed' >&2; exit 1; }"
                .to_string(),
        ]),
        error_pattern: None,
    }
}

fn raw(front_matter: &str, body: &str) -> String {
    let front_matter = if front_matter.is_empty() {
        "flags: [raw]".to_string()
    } else {
        format!("flags: [raw]\n{}", front_matter)
    };
    fixture_source(&front_matter, body)
}

fn run(config: HostConfig, files: &[(&str, String)]) -> conformance_harness::TestReport {
    let temp_dir = TempDir::new().unwrap();
    for (name, contents) in files {
        fs::write(temp_dir.path().join(name), contents).unwrap();
    }

    let engine = HostEngine::new(config).unwrap();
    let loader = FixtureLoader::new([temp_dir.path()], IncludeTable::bundled());
    ConformanceHarness::new(engine)
        .with_workers(2)
        .with_timeout(Duration::from_secs(5))
        .run(&loader)
        .unwrap()
}

#[test]
fn test_normal_exit_passes() {
    let report = run(sh_config(), &[("ok.js", raw("", "echo ok"))]);
    assert_eq!(report.verdict("ok.js"), Some(&Verdict::Pass));
}

#[test]
fn test_runtime_error_kind_from_stderr() {
    let report = run(
        sh_config(),
        &[
            (
                "expected.js",
                raw(
                    "negative:\n  phase: runtime\n  type: TypeError",
                    "echo 'TypeError: boom' >&2; exit 1",
                ),
            ),
            (
                "unexpected.js",
                raw("", "echo 'RangeError: out of range' >&2; exit 3"),
            ),
        ],
    );

    assert_eq!(report.verdict("expected.js"), Some(&Verdict::Pass));
    assert_eq!(
        report.verdict("unexpected.js"),
        Some(&Verdict::Fail(
            "unexpected failure: RangeError at runtime".to_string()
        ))
    );
}

#[test]
fn test_failed_check_is_early_syntax_error() {
    let marker_dir = TempDir::new().unwrap();
    let marker = marker_dir.path().join("ran.txt");
    let report = run(
        sh_config(),
        &[(
            "early.js",
            raw(
                "negative:\n  phase: early\n  type: SyntaxError",
                &format!("touch '{}'\nif true; then", marker.display()),
            ),
        )],
    );

    assert_eq!(report.verdict("early.js"), Some(&Verdict::Pass));
    assert!(!marker.exists(), "body ran after a failed syntax check");
}

#[test]
fn test_failed_check_without_kind_is_not_syntax_error() {
    let config = HostConfig {
        check_args: Some(vec!["-c".to_string(), "exit 1".to_string()]),
        ..sh_config()
    };
    let report = run(
        config,
        &[(
            "early.js",
            raw("negative:\n  phase: early\n  type: SyntaxError", "echo fine"),
        )],
    );

    let verdict = report.verdict("early.js").unwrap();
    assert_ne!(verdict, &Verdict::Pass);
    assert_eq!(
        verdict,
        &Verdict::Fail("expected early/SyntaxError, got early/UnknownError".to_string())
    );
}

#[test]
fn test_without_check_phase_is_indeterminate() {
    let config = HostConfig {
        check_args: None,
        ..sh_config()
    };
    let report = run(
        config,
        &[(
            "negative.js",
            raw(
                "negative:\n  phase: early\n  type: SyntaxError",
                "echo 'SyntaxError: bad' >&2; exit 1",
            ),
        )],
    );

    let verdict = report.verdict("negative.js").unwrap();
    assert!(verdict.is_error());
    assert!(verdict.reason().unwrap().contains("phase indeterminate"));
}

#[test]
fn test_deadline_kills_process() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("slow.js"), raw("", "sleep 5")).unwrap();

    let engine = HostEngine::new(sh_config()).unwrap();
    let loader = FixtureLoader::new([temp_dir.path()], IncludeTable::bundled());
    let harness = ConformanceHarness::new(engine).with_timeout(Duration::from_millis(300));
    let report = harness.run(&loader).unwrap();

    assert_eq!(report.verdict("slow.js"), Some(&Verdict::Timeout));
    assert!(harness.abandoned_sandboxes().is_empty());
}

#[test]
fn test_includes_are_staged_before_body() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("uses-helper.js"),
        raw("includes: [helper.sh]", "test \"$HELPER\" = loaded || exit 1"),
    )
    .unwrap();

    let mut includes = IncludeTable::new();
    includes.insert("helper.sh", "HELPER=loaded");

    let engine = HostEngine::new(sh_config()).unwrap();
    let loader = FixtureLoader::new([temp_dir.path()], includes);
    let report = ConformanceHarness::new(engine).run(&loader).unwrap();

    assert_eq!(report.verdict("uses-helper.js"), Some(&Verdict::Pass));
}

#[test]
fn test_stdout_is_captured() {
    let engine = HostEngine::new(sh_config()).unwrap();
    let options = conformance_harness::ContextOptions {
        mode: conformance_harness::RunMode::Sloppy,
        deadline: None,
    };
    let mut context = engine.create_context(&options).unwrap();

    let completion = engine
        .evaluate(&mut context, &Fragment::body("echo Test262:AsyncTestComplete"))
        .unwrap();
    assert_eq!(
        completion,
        conformance_harness::Completion::Normal {
            output: "Test262:AsyncTestComplete\n".to_string()
        }
    );
}

#[test]
fn test_missing_program_is_error_verdict() {
    let config = HostConfig {
        program: "definitely-not-an-engine-binary".to_string(),
        ..sh_config()
    };
    let report = run(config, &[("any.js", raw("", "echo ok"))]);

    let verdict = report.verdict("any.js").unwrap();
    assert!(verdict.is_error());
    assert!(verdict.reason().unwrap().contains("failed to spawn"));
}

#[test]
fn test_empty_program_rejected() {
    let config = HostConfig {
        program: "  ".to_string(),
        ..sh_config()
    };
    assert!(matches!(
        HostEngine::new(config),
        Err(HarnessError::Config(_))
    ));
}
