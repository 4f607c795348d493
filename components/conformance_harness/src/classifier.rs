use crate::engine::{Completion, RunMode};
use crate::metadata::Expectation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of one fixture's outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "lowercase")]
pub enum Verdict {
    /// Outcome matched the declared expectation
    Pass,
    /// Outcome contradicted the declared expectation
    Fail(String),
    /// The fixture could not be set up or judged
    Error(String),
    /// The fixture did not finish in time
    Timeout,
}

impl Verdict {
    /// Check if the verdict is a pass
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Check if the verdict is a failure
    pub fn is_fail(&self) -> bool {
        matches!(self, Verdict::Fail(_))
    }

    /// Check if the verdict is a setup error
    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error(_))
    }

    /// Check if the verdict is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Verdict::Timeout)
    }

    /// Uppercase label for reports
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail(_) => "FAIL",
            Verdict::Error(_) => "ERROR",
            Verdict::Timeout => "TIMEOUT",
        }
    }

    /// Reason text for non-pass verdicts
    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Fail(reason) | Verdict::Error(reason) => Some(reason),
            Verdict::Timeout => Some("fixture did not complete before the timeout"),
            Verdict::Pass => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) if !self.is_timeout() => write!(f, "{}: {}", self.label(), reason),
            _ => f.write_str(self.label()),
        }
    }
}

/// Judge an engine completion against the fixture's expectation
///
/// Kind and phase must both match exactly. A negative fixture whose failure
/// carries no phase cannot be judged and yields an `Error` verdict.
pub fn classify(expectation: &Expectation, completion: &Completion) -> Verdict {
    match (expectation, completion) {
        (Expectation::Success, Completion::Normal { .. }) => Verdict::Pass,
        (Expectation::Success, Completion::Thrown(thrown)) => Verdict::Fail(format!(
            "unexpected failure: {} at {}",
            thrown.kind,
            thrown.phase_label()
        )),
        (Expectation::Failure { .. }, Completion::Normal { .. }) => {
            Verdict::Fail("expected failure did not occur".to_string())
        }
        (Expectation::Failure { phase, kind }, Completion::Thrown(thrown)) => match thrown.phase {
            None => Verdict::Error(format!(
                "phase indeterminate: expected {}/{}, engine reported {} without a phase",
                phase, kind, thrown.kind
            )),
            Some(actual) if actual == *phase && thrown.kind == *kind => Verdict::Pass,
            Some(actual) => Verdict::Fail(format!(
                "expected {}/{}, got {}/{}",
                phase, kind, actual, thrown.kind
            )),
        },
    }
}

/// Fold per-mode verdicts into the fixture verdict
///
/// The first non-pass verdict wins; its reason is prefixed with the mode it
/// came from.
pub fn combine<I>(verdicts: I) -> Verdict
where
    I: IntoIterator<Item = (RunMode, Verdict)>,
{
    for (mode, verdict) in verdicts {
        let prefix = mode.reason_prefix().unwrap_or_default();
        match verdict {
            Verdict::Pass => continue,
            Verdict::Fail(reason) => return Verdict::Fail(format!("{}{}", prefix, reason)),
            Verdict::Error(reason) => return Verdict::Error(format!("{}{}", prefix, reason)),
            Verdict::Timeout => return Verdict::Timeout,
        }
    }
    Verdict::Pass
}
