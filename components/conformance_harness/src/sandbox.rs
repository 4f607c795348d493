use crate::engine::{Completion, ContextOptions, Engine, Fragment, FragmentKind, Phase, RunMode, Thrown};
use crate::error::EngineError;
use crate::metadata::TestMetadata;
use std::time::Instant;
use tracing::trace;

const STRICT_DIRECTIVE: &str = "\"use strict\";\n";
const ASYNC_COMPLETE: &str = "Test262:AsyncTestComplete";
const ASYNC_FAILURE: &str = "Test262:AsyncTestFailure:";

/// Modes a fixture must pass in, in evaluation order
pub fn modes_for(metadata: &TestMetadata, strict_variants: bool) -> Vec<RunMode> {
    if metadata.is_module() {
        vec![RunMode::Module]
    } else if metadata.is_raw() || metadata.is_no_strict() {
        vec![RunMode::Sloppy]
    } else if metadata.is_strict_only() {
        vec![RunMode::Strict]
    } else if strict_variants {
        vec![RunMode::Sloppy, RunMode::Strict]
    } else {
        vec![RunMode::Sloppy]
    }
}

/// Evaluates one fixture's load list in a fresh context
///
/// A sandbox holds no state of its own; every [`Sandbox::run`] creates a new
/// engine context and drops it before returning.
pub struct Sandbox<'e, E: Engine> {
    engine: &'e E,
}

impl<'e, E: Engine> Sandbox<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Self { engine }
    }

    /// Evaluate `fragments` (includes, then the body) in a new context
    ///
    /// Returns the body's completion. A failing include is a setup fault and
    /// is reported as [`EngineError::IncludeFailed`].
    pub fn run(
        &self,
        metadata: &TestMetadata,
        fragments: &[Fragment],
        mode: RunMode,
        deadline: Option<Instant>,
    ) -> Result<Completion, EngineError> {
        let options = ContextOptions { mode, deadline };
        let mut context = self.engine.create_context(&options)?;

        for fragment in fragments {
            if options.expired() {
                return Err(EngineError::Timeout);
            }

            let prepared = prepare(fragment, mode);
            let completion = self.engine.evaluate(&mut context, &prepared)?;
            trace!(fragment = fragment.name(), ?mode, normal = completion.is_normal(), "evaluated");

            match (&fragment.kind, completion) {
                (FragmentKind::Include(_), Completion::Normal { .. }) => continue,
                (FragmentKind::Include(name), Completion::Thrown(thrown)) => {
                    return Err(EngineError::IncludeFailed {
                        name: name.clone(),
                        kind: thrown.kind,
                        message: thrown.message,
                    })
                }
                (FragmentKind::Body, completion) => {
                    return Ok(if metadata.is_async() {
                        settle_async(completion)
                    } else {
                        completion
                    })
                }
            }
        }

        Err(EngineError::Context("load list has no body fragment".into()))
    }
}

fn prepare(fragment: &Fragment, mode: RunMode) -> Fragment {
    match mode {
        RunMode::Strict => Fragment {
            kind: fragment.kind.clone(),
            source: format!("{}{}", STRICT_DIRECTIVE, fragment.source),
        },
        RunMode::Sloppy | RunMode::Module => fragment.clone(),
    }
}

/// Interpret the `$DONE` protocol printed by an async fixture
fn settle_async(completion: Completion) -> Completion {
    let output = match completion {
        Completion::Normal { output } => output,
        thrown => return thrown,
    };

    let mut signal = None;
    for line in output.lines().map(str::trim) {
        if line == ASYNC_COMPLETE {
            signal = Some(None);
            break;
        }
        if let Some(rest) = line.strip_prefix(ASYNC_FAILURE) {
            let (kind, message) = rest.split_once(':').unwrap_or((rest, ""));
            signal = Some(Some(Thrown::new(kind.trim(), message.trim()).at(Phase::Runtime)));
            break;
        }
    }

    match signal {
        Some(None) => Completion::Normal { output },
        Some(Some(thrown)) => Completion::Thrown(thrown),
        None => Completion::Thrown(
            Thrown::new("Test262Error", "async test did not report completion").at(Phase::Runtime),
        ),
    }
}
