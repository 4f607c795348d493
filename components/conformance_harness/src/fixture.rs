use crate::error::{HarnessError, HarnessResult};
use crate::metadata::{strip_front_matter, TestMetadata};
use std::path::{Path, PathBuf};

/// A discovered fixture file that has not been read yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSource {
    /// Identifier: path relative to its discovery root, `/`-separated
    pub id: String,
    /// Location on disk
    pub path: PathBuf,
}

impl FixtureSource {
    /// Build a source whose id is `path` relative to `root`
    pub fn new(root: &Path, path: &Path) -> Self {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let id = if relative.as_os_str().is_empty() {
            // The root itself is a file
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        } else {
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        };

        Self {
            id,
            path: path.to_path_buf(),
        }
    }
}

/// A fixture with its source and parsed metadata
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Unique identifier within a run
    pub id: String,
    /// Path the fixture was read from
    pub path: PathBuf,
    /// Full source text, front-matter included
    pub source: String,
    /// Parsed metadata from YAML front-matter
    pub metadata: TestMetadata,
}

impl Fixture {
    /// Build a fixture from in-memory source text
    pub fn from_source(id: impl Into<String>, source: impl Into<String>) -> HarnessResult<Self> {
        let id = id.into();
        let source = source.into();
        let metadata = TestMetadata::parse(&source)?;
        Ok(Self {
            path: PathBuf::from(&id),
            id,
            source,
            metadata,
        })
    }

    /// Read and parse a discovered fixture
    pub fn load(source: &FixtureSource) -> HarnessResult<Self> {
        let text = std::fs::read_to_string(&source.path)
            .map_err(|e| HarnessError::io(&source.path, e))?;
        let metadata = TestMetadata::parse(&text)?;

        Ok(Self {
            id: source.id.clone(),
            path: source.path.clone(),
            source: text,
            metadata,
        })
    }

    /// File name without extension
    pub fn name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.id)
    }

    /// Body without the metadata block
    pub fn code(&self) -> String {
        strip_front_matter(&self.source)
    }
}
