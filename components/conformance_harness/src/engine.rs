//! The seam between the harness and the engine under test
//!
//! The harness never interprets fixture code itself. It hands source fragments
//! to an [`Engine`] and receives a [`Completion`]. Evaluation is split into a
//! compile step and an execute step so a failure raised while statically
//! analyzing a fragment is reported before any of its statements run.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Phase at which a failure is raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Static analysis, before any statement executes
    #[serde(alias = "parse")]
    Early,
    /// Module linking
    Resolution,
    /// Statement execution
    Runtime,
}

impl Phase {
    /// Lowercase label used in verdict reasons
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Early => "early",
            Phase::Resolution => "resolution",
            Phase::Runtime => "runtime",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uncaught failure reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thrown {
    /// Error kind label (e.g. "SyntaxError", "Test262Error")
    pub kind: String,
    /// Engine-provided message, informational only
    pub message: String,
    /// `None` when the engine cannot tell compile-time from run-time failures
    pub phase: Option<Phase>,
}

impl Thrown {
    /// A failure whose phase is not known yet
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            phase: None,
        }
    }

    /// Tag the failure with a phase
    pub fn at(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Phase label, `indeterminate` when unknown
    pub fn phase_label(&self) -> &'static str {
        self.phase.map(|p| p.as_str()).unwrap_or("indeterminate")
    }
}

/// How evaluation of a fragment ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Ran to completion; `output` is whatever the engine printed
    Normal { output: String },
    /// Ended with an uncaught failure
    Thrown(Thrown),
}

impl Completion {
    /// Normal completion with no output
    pub fn normal() -> Self {
        Completion::Normal {
            output: String::new(),
        }
    }

    /// Check if evaluation completed normally
    pub fn is_normal(&self) -> bool {
        matches!(self, Completion::Normal { .. })
    }

    /// The thrown failure, if any
    pub fn thrown(&self) -> Option<&Thrown> {
        match self {
            Completion::Thrown(thrown) => Some(thrown),
            Completion::Normal { .. } => None,
        }
    }
}

/// Role of a fragment within a fixture's load list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentKind {
    /// A named helper include
    Include(String),
    /// The fixture itself
    Body,
}

/// One unit of source handed to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub source: String,
}

impl Fragment {
    /// A named helper include
    pub fn include(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Include(name.into()),
            source: source.into(),
        }
    }

    /// The fixture body
    pub fn body(source: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Body,
            source: source.into(),
        }
    }

    /// Check if this is the fixture body
    pub fn is_body(&self) -> bool {
        matches!(self.kind, FragmentKind::Body)
    }

    /// Display name: the include name, or `<body>`
    pub fn name(&self) -> &str {
        match &self.kind {
            FragmentKind::Include(name) => name,
            FragmentKind::Body => "<body>",
        }
    }
}

/// Evaluation mode of one fixture run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Non-strict script
    Sloppy,
    /// Script with a `"use strict";` directive
    Strict,
    /// ES module
    Module,
}

impl RunMode {
    /// Prefix used when reporting a non-pass verdict from this mode
    pub fn reason_prefix(&self) -> Option<&'static str> {
        match self {
            RunMode::Sloppy => None,
            RunMode::Strict => Some("[strict mode] "),
            RunMode::Module => Some("[module] "),
        }
    }
}

/// Parameters fixed for the lifetime of one context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    pub mode: RunMode,
    /// Engines should stop working and return [`EngineError::Timeout`] past this
    pub deadline: Option<Instant>,
}

impl ContextOptions {
    /// Check if the deadline has already passed
    pub fn expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}

/// Why a fragment could not be compiled
#[derive(Debug)]
pub enum CompileFailure {
    /// The fragment is statically invalid
    Thrown(Thrown),
    /// The engine has no separate compile step
    PhaseUnsupported,
    /// The engine itself failed
    Engine(EngineError),
}

impl From<EngineError> for CompileFailure {
    fn from(err: EngineError) -> Self {
        CompileFailure::Engine(err)
    }
}

/// An engine under test
///
/// Each context is owned exclusively by one sandbox and dropped when the
/// fixture finishes; no state may be shared between contexts.
pub trait Engine: Send + Sync {
    /// Per-fixture evaluation state
    type Context: Send;

    /// Engine name for diagnostics
    fn name(&self) -> &str;

    /// Create a fresh, isolated context
    fn create_context(&self, options: &ContextOptions) -> Result<Self::Context, EngineError>;

    /// Statically analyze a fragment without running any of it
    fn compile(&self, context: &mut Self::Context, fragment: &Fragment)
        -> Result<(), CompileFailure>;

    /// Run a fragment in the context
    fn execute(
        &self,
        context: &mut Self::Context,
        fragment: &Fragment,
    ) -> Result<Completion, EngineError>;

    /// Compile then execute a fragment, tagging the failure phase
    ///
    /// Compile failures are `Early`. Execution failures keep the phase the
    /// engine reported, defaulting to `Runtime`. When the engine cannot
    /// compile separately every failure is reported without a phase.
    fn evaluate(
        &self,
        context: &mut Self::Context,
        fragment: &Fragment,
    ) -> Result<Completion, EngineError> {
        match self.compile(context, fragment) {
            Ok(()) => Ok(match self.execute(context, fragment)? {
                Completion::Thrown(mut thrown) => {
                    thrown.phase.get_or_insert(Phase::Runtime);
                    Completion::Thrown(thrown)
                }
                normal => normal,
            }),
            Err(CompileFailure::Thrown(thrown)) => {
                Ok(Completion::Thrown(thrown.at(Phase::Early)))
            }
            Err(CompileFailure::PhaseUnsupported) => {
                Ok(match self.execute(context, fragment)? {
                    Completion::Thrown(mut thrown) => {
                        thrown.phase = None;
                        Completion::Thrown(thrown)
                    }
                    normal => normal,
                })
            }
            Err(CompileFailure::Engine(err)) => Err(err),
        }
    }
}
