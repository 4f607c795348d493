//! Error types for the conformance harness
//!
//! Two families live here. [`HarnessError`] covers faults of the harness
//! itself (bad metadata, unknown includes, duplicate identifiers, I/O and
//! configuration problems). [`EngineError`] covers faults of the engine
//! collaborator that are not JavaScript completions: a process that could not
//! be spawned, a fixture that ran past its deadline, or a helper include that
//! failed to load.

use std::path::PathBuf;
use thiserror::Error;

/// Faults raised by the harness while discovering, loading or recording fixtures
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Front-matter block is absent, unterminated or not valid YAML
    #[error("malformed metadata: {reason}")]
    MalformedMetadata { reason: String },

    /// A declared include has no known source text
    #[error("unresolved include: {name}")]
    UnresolvedInclude { name: String },

    /// Two fixtures share an identifier within one run
    #[error("duplicate fixture id: {id}")]
    DuplicateFixtureId { id: String },

    /// Invalid harness configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// File system access failed
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON report (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parsing failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl HarnessError {
    /// Build an I/O error tagged with the path being accessed
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a metadata error from any displayable reason
    pub fn malformed(reason: impl Into<String>) -> Self {
        HarnessError::MalformedMetadata {
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole run rather than a single fixture
    ///
    /// Metadata and include faults belong to one fixture and are recorded as an
    /// `Error` verdict. Everything else indicates a harness configuration defect.
    pub fn is_setup_error(&self) -> bool {
        !matches!(
            self,
            HarnessError::MalformedMetadata { .. } | HarnessError::UnresolvedInclude { .. }
        )
    }
}

/// Faults of the engine collaborator that are not script completions
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine process could not be started
    #[error("failed to spawn engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Evaluation did not finish before the deadline
    #[error("evaluation exceeded its deadline")]
    Timeout,

    /// A helper include threw while being loaded into the context
    #[error("include {name} failed: {kind}: {message}")]
    IncludeFailed {
        name: String,
        kind: String,
        message: String,
    },

    /// The execution context could not be prepared
    #[error("context setup failed: {0}")]
    Context(String),
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;
