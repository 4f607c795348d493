//! Engine adapter for an external engine binary
//!
//! Every context owns a temporary directory. Include fragments are
//! syntax-checked on their own and staged; the body is syntax-checked on its
//! own and then the staged script runs as a single file, so globals defined by
//! includes are visible to the body. A failing syntax check is an early
//! failure: nothing of that fragment has been executed.
//!
//! Thrown error kinds are recovered from the process output with a regex.

use crate::engine::{
    CompileFailure, Completion, ContextOptions, Engine, Fragment, FragmentKind, RunMode, Thrown,
};
use crate::error::{EngineError, HarnessError, HarnessResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, trace};

/// Matches `TypeError: message`, `Uncaught TypeError: message` and
/// `Test262Error { message: ... }` lines.
pub const DEFAULT_ERROR_PATTERN: &str =
    r"(?m)^(?:Uncaught\s+)?([A-Za-z_$][\w$]*(?:Error|Exception))(?:(?::[ \t]*|[ \t]+\{[ \t]*)(.*?))?[ \t]*\r?$";

/// Kind reported when the output names no error type
pub const UNKNOWN_KIND: &str = "UnknownError";

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How to invoke the engine binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Engine executable
    pub program: String,
    /// Arguments placed before the script path when running
    pub args: Vec<String>,
    /// Arguments placed before the script path for a syntax-only check;
    /// `None` when the engine has no such mode
    pub check_args: Option<Vec<String>>,
    /// Regex whose first group captures the error kind and second the message
    pub error_pattern: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            args: Vec::new(),
            check_args: Some(vec!["--check".to_string()]),
            error_pattern: None,
        }
    }
}

/// Captured result of one engine process
#[derive(Debug)]
struct ProcessOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// Per-fixture state of the host engine
#[derive(Debug)]
pub struct HostContext {
    dir: TempDir,
    options: ContextOptions,
    staged: String,
    checks: usize,
}

impl HostContext {
    fn extension(&self) -> &'static str {
        match self.options.mode {
            RunMode::Module => "mjs",
            RunMode::Sloppy | RunMode::Strict => "js",
        }
    }

    fn write(&self, stem: &str, source: &str) -> Result<PathBuf, EngineError> {
        let path = self.dir.path().join(format!("{}.{}", stem, self.extension()));
        std::fs::write(&path, source)
            .map_err(|e| EngineError::Context(format!("cannot write {}: {}", path.display(), e)))?;
        Ok(path)
    }
}

/// An engine driven as a child process
#[derive(Debug)]
pub struct HostEngine {
    config: HostConfig,
    error_re: Regex,
}

impl HostEngine {
    /// Create a host engine, validating the error pattern
    pub fn new(config: HostConfig) -> HarnessResult<Self> {
        if config.program.trim().is_empty() {
            return Err(HarnessError::Config("host program must not be empty".into()));
        }
        let pattern = config
            .error_pattern
            .as_deref()
            .unwrap_or(DEFAULT_ERROR_PATTERN);
        let error_re = Regex::new(pattern)
            .map_err(|e| HarnessError::Config(format!("invalid error pattern: {}", e)))?;

        Ok(Self { config, error_re })
    }

    /// Active configuration
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Recover a thrown failure from process output
    ///
    /// Standard error is searched before standard output. `fallback_kind` is
    /// used when no line names an error type.
    pub fn parse_thrown(&self, stderr: &str, stdout: &str, fallback_kind: &str) -> Thrown {
        for text in [stderr, stdout] {
            if let Some(caps) = self.error_re.captures(text) {
                let kind = caps.get(1).map(|m| m.as_str()).unwrap_or(fallback_kind);
                let message = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                return Thrown::new(kind, message);
            }
        }

        let message = stderr
            .lines()
            .chain(stdout.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default();
        Thrown::new(fallback_kind, message)
    }

    fn run(
        &self,
        context: &HostContext,
        args: &[String],
        script: &Path,
        label: &str,
    ) -> Result<ProcessOutput, EngineError> {
        let stdout_path = context.dir.path().join(format!("{}.stdout", label));
        let stderr_path = context.dir.path().join(format!("{}.stderr", label));
        let stdout = File::create(&stdout_path).map_err(|e| EngineError::Context(e.to_string()))?;
        let stderr = File::create(&stderr_path).map_err(|e| EngineError::Context(e.to_string()))?;

        trace!(program = %self.config.program, ?args, script = %script.display(), "spawning engine");

        let mut child = Command::new(&self.config.program)
            .args(args)
            .arg(script)
            .current_dir(context.dir.path())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => return Err(EngineError::Context(format!("wait failed: {}", e))),
            }
            if context.options.expired() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Timeout);
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let read = |path: &Path| {
            std::fs::read(path)
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .map_err(|e| EngineError::Context(e.to_string()))
        };

        Ok(ProcessOutput {
            status,
            stdout: read(&stdout_path)?,
            stderr: read(&stderr_path)?,
        })
    }
}

impl Engine for HostEngine {
    type Context = HostContext;

    fn name(&self) -> &str {
        &self.config.program
    }

    fn create_context(&self, options: &ContextOptions) -> Result<HostContext, EngineError> {
        let dir = tempfile::Builder::new()
            .prefix("conformance-")
            .tempdir()
            .map_err(|e| EngineError::Context(format!("cannot create temp dir: {}", e)))?;

        Ok(HostContext {
            dir,
            options: *options,
            staged: String::new(),
            checks: 0,
        })
    }

    fn compile(&self, context: &mut HostContext, fragment: &Fragment) -> Result<(), CompileFailure> {
        let Some(check_args) = &self.config.check_args else {
            return Err(CompileFailure::PhaseUnsupported);
        };

        context.checks += 1;
        let label = format!("check-{}", context.checks);
        let path = context.write(&label, &fragment.source)?;
        let output = self.run(context, check_args, &path, &label)?;

        if output.status.success() {
            return Ok(());
        }

        // A failed check only counts as the kind its output names
        let thrown = self.parse_thrown(&output.stderr, &output.stdout, UNKNOWN_KIND);
        if thrown.kind == UNKNOWN_KIND {
            debug!(status = %output.status, "syntax check failed without naming an error kind");
        }
        Err(CompileFailure::Thrown(thrown))
    }

    fn execute(
        &self,
        context: &mut HostContext,
        fragment: &Fragment,
    ) -> Result<Completion, EngineError> {
        if let FragmentKind::Include(_) = fragment.kind {
            context.staged.push_str(&fragment.source);
            context.staged.push('\n');
            return Ok(Completion::normal());
        }

        let mut script = std::mem::take(&mut context.staged);
        script.push_str(&fragment.source);
        let path = context.write("fixture", &script)?;
        let output = self.run(context, &self.config.args, &path, "fixture")?;

        if output.status.success() {
            Ok(Completion::Normal {
                output: output.stdout,
            })
        } else {
            Ok(Completion::Thrown(self.parse_thrown(
                &output.stderr,
                &output.stdout,
                UNKNOWN_KIND,
            )))
        }
    }
}
