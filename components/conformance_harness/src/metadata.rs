use crate::engine::Phase;
use crate::error::{HarnessError, HarnessResult};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

const FRONT_MATTER_START: &str = "/*---";

fn front_matter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)/\*---[ \t]*\r?\n(.*?)\r?\n?[ \t]*---\*/")
            .expect("front-matter pattern is a valid regex")
    })
}

/// Negative test expectation from the `negative` front-matter key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NegativeExpectation {
    /// Phase where the error is expected
    pub phase: Phase,
    /// Error type expected (e.g., "SyntaxError", "ReferenceError")
    #[serde(rename = "type")]
    pub error_type: String,
}

/// What a fixture declares about its own outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Must run to completion without an uncaught failure
    Success,
    /// Must fail with exactly this kind at exactly this phase
    Failure { phase: Phase, kind: String },
}

/// Fixture metadata parsed from YAML front-matter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TestMetadata {
    /// Human-readable description of what the fixture verifies
    pub description: String,
    /// Additional information about the fixture
    #[serde(deserialize_with = "scalar_string")]
    pub info: Option<String>,
    /// Expected error for negative fixtures
    pub negative: Option<NegativeExpectation>,
    /// Helper files that must be loaded before the body, in declaration order
    pub includes: Vec<String>,
    /// Free-form execution flags (e.g., "onlyStrict", "raw", "async", "generated")
    pub flags: BTreeSet<String>,
    /// Language features exercised by this fixture
    pub features: Vec<String>,
    /// ES5.1 section identifier
    #[serde(deserialize_with = "scalar_string")]
    pub es5id: Option<String>,
    /// ES6 section identifier
    #[serde(deserialize_with = "scalar_string")]
    pub es6id: Option<String>,
    /// ES section identifier
    #[serde(deserialize_with = "scalar_string")]
    pub esid: Option<String>,
    /// Author of the fixture
    #[serde(deserialize_with = "scalar_string")]
    pub author: Option<String>,
    /// Locales required by Intl fixtures; accepted and otherwise ignored
    pub locale: Vec<String>,
}

/// Section ids such as `es6id: 12.1` are plain YAML numbers; keep their text.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_yaml::Value::Null) => None,
        Some(serde_yaml::Value::String(s)) => Some(s),
        Some(serde_yaml::Value::Number(n)) => Some(n.to_string()),
        Some(serde_yaml::Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a scalar, found {:?}",
                other
            )))
        }
    })
}

impl TestMetadata {
    /// Parse YAML front-matter from fixture source
    ///
    /// Fixtures carry metadata in a YAML block between `/*---` and `---*/`.
    /// The block must be present, terminated, valid YAML, and declare a
    /// `description`.
    pub fn parse(source: &str) -> HarnessResult<Self> {
        let yaml = match front_matter_regex().captures(source) {
            Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
            None if source.contains(FRONT_MATTER_START) => {
                return Err(HarnessError::malformed("unterminated front-matter block"))
            }
            None => return Err(HarnessError::malformed("no front-matter block found")),
        };

        let metadata: TestMetadata = serde_yaml::from_str(yaml)
            .map_err(|e| HarnessError::malformed(format!("invalid YAML front-matter: {}", e)))?;

        if metadata.description.trim().is_empty() {
            return Err(HarnessError::malformed("missing required field `description`"));
        }

        Ok(metadata)
    }

    /// The declared outcome of the fixture
    pub fn expectation(&self) -> Expectation {
        match &self.negative {
            Some(negative) => Expectation::Failure {
                phase: negative.phase,
                kind: negative.error_type.clone(),
            },
            None => Expectation::Success,
        }
    }

    /// Check if the fixture expects a failure before any statement runs
    pub fn expects_early_error(&self) -> bool {
        matches!(self.negative.as_ref().map(|n| n.phase), Some(Phase::Early))
    }

    /// Check if the fixture expects a runtime-phase error
    pub fn expects_runtime_error(&self) -> bool {
        matches!(self.negative.as_ref().map(|n| n.phase), Some(Phase::Runtime))
    }

    /// Get the expected error type for negative fixtures
    pub fn expected_error_type(&self) -> Option<&str> {
        self.negative.as_ref().map(|n| n.error_type.as_str())
    }

    /// Check if the fixture declares a feature
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Check if the fixture requires strict mode only
    pub fn is_strict_only(&self) -> bool {
        self.flags.contains("onlyStrict")
    }

    /// Check if the fixture requires non-strict mode only
    pub fn is_no_strict(&self) -> bool {
        self.flags.contains("noStrict")
    }

    /// Check if the fixture is an ES module
    pub fn is_module(&self) -> bool {
        self.flags.contains("module")
    }

    /// Check if the fixture signals completion through `$DONE`
    pub fn is_async(&self) -> bool {
        self.flags.contains("async")
    }

    /// Check if the fixture runs without implicit includes or mode variants
    pub fn is_raw(&self) -> bool {
        self.flags.contains("raw")
    }

    /// Check if the fixture was procedurally generated
    pub fn is_generated(&self) -> bool {
        self.flags.contains("generated")
    }
}

/// Remove the front-matter block, leaving the executable body
pub fn strip_front_matter(source: &str) -> String {
    match front_matter_regex().find(source) {
        Some(m) => {
            let mut body = String::with_capacity(source.len() - m.len());
            body.push_str(&source[..m.start()]);
            body.push_str(source[m.end()..].trim_start_matches(['\r', '\n']));
            body
        }
        None => source.to_string(),
    }
}
