use crate::classifier::Verdict;
use crate::cli::{EXIT_FAILURES, EXIT_SUCCESS};
use crate::error::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One recorded verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Fixture identifier
    pub id: String,
    /// Classification of its outcome
    pub verdict: Verdict,
}

/// Run report with counts and per-fixture verdicts in recording order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    /// Number of verdicts recorded
    pub total: usize,
    /// Number of fixtures that passed
    pub passed: usize,
    /// Number of fixtures that failed
    pub failed: usize,
    /// Number of fixtures that could not be set up or judged
    pub errors: usize,
    /// Number of fixtures that timed out
    pub timeouts: usize,
    /// Number of fixtures excluded by the selection
    pub filtered: usize,
    /// Every verdict, in recording order
    pub results: Vec<ReportEntry>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl TestReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verdict for a fixture
    ///
    /// Recording the same identifier twice is a harness configuration fault.
    pub fn add_result(&mut self, id: &str, verdict: Verdict) -> HarnessResult<()> {
        if !self.seen.insert(id.to_string()) {
            return Err(HarnessError::DuplicateFixtureId { id: id.to_string() });
        }

        self.total += 1;
        match verdict {
            Verdict::Pass => self.passed += 1,
            Verdict::Fail(_) => self.failed += 1,
            Verdict::Error(_) => self.errors += 1,
            Verdict::Timeout => self.timeouts += 1,
        }
        self.results.push(ReportEntry {
            id: id.to_string(),
            verdict,
        });
        Ok(())
    }

    /// Count a fixture the selection excluded
    pub fn record_filtered(&mut self) {
        self.filtered += 1;
    }

    /// Check if a fixture has been recorded
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Verdict recorded for a fixture
    pub fn verdict(&self, id: &str) -> Option<&Verdict> {
        self.results
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.verdict)
    }

    /// Non-pass entries in recording order
    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.results.iter().filter(|entry| !entry.verdict.is_pass())
    }

    /// Calculate the pass rate as a percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    /// Check if every recorded fixture passed
    pub fn is_success(&self) -> bool {
        self.passed == self.total
    }

    /// Process exit code for this report
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURES
        }
    }

    /// One-line count summary
    pub fn summary(&self) -> String {
        format!(
            "total: {} | pass: {} | fail: {} | error: {} | timeout: {} | filtered: {} | pass rate: {:.1}%",
            self.total,
            self.passed,
            self.failed,
            self.errors,
            self.timeouts,
            self.filtered,
            self.pass_rate()
        )
    }

    /// Summary followed by every non-pass verdict and its reason
    pub fn detailed_summary(&self) -> String {
        let mut output = self.summary();

        let mut failures = self.failures().peekable();
        if failures.peek().is_some() {
            output.push_str("\n\nNon-passing fixtures:\n");
            for entry in failures {
                output.push_str(&format!("  - [{}] {}\n", entry.verdict.label(), entry.id));
                if let Some(reason) = entry.verdict.reason() {
                    output.push_str(&format!("    Reason: {}\n", reason));
                }
            }
        }

        output
    }

    /// Export report as JSON
    pub fn to_json(&self) -> HarnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Import report from JSON
    pub fn from_json(json: &str) -> HarnessResult<Self> {
        let mut report: TestReport = serde_json::from_str(json)?;
        report.seen = report.results.iter().map(|entry| entry.id.clone()).collect();
        Ok(report)
    }
}
