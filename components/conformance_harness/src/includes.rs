//! Helper include sources
//!
//! Fixtures name their helpers (`includes: [propertyHelper.js]`) and the
//! harness resolves each name through an [`IncludeTable`]. A minimal set of
//! helpers is bundled with the crate; a full harness directory can be layered
//! on top, replacing bundled entries with the same file name.

use crate::error::{HarnessError, HarnessResult};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Includes loaded ahead of every non-raw fixture, in order
pub const IMPLICIT_INCLUDES: &[&str] = &["assert.js", "sta.js"];

/// Include loaded ahead of fixtures flagged `async`
pub const ASYNC_INCLUDE: &str = "doneprintHandle.js";

const BUNDLED: &[(&str, &str)] = &[
    ("assert.js", include_str!("../harness/assert.js")),
    ("sta.js", include_str!("../harness/sta.js")),
    ("doneprintHandle.js", include_str!("../harness/doneprintHandle.js")),
    ("propertyHelper.js", include_str!("../harness/propertyHelper.js")),
    ("decimalToHexString.js", include_str!("../harness/decimalToHexString.js")),
    ("testAtomics.js", include_str!("../harness/testAtomics.js")),
];

/// Lookup table from include name to source text
#[derive(Debug, Clone, Default)]
pub struct IncludeTable {
    sources: BTreeMap<String, String>,
}

impl IncludeTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The helpers bundled with the harness
    pub fn bundled() -> Self {
        let mut table = Self::new();
        for (name, source) in BUNDLED {
            table.insert(*name, *source);
        }
        table
    }

    /// Overlay every `*.js` file directly inside `dir`
    pub fn with_dir<P: AsRef<Path>>(mut self, dir: P) -> HarnessResult<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| HarnessError::io(dir, e))?;

        let mut loaded = 0usize;
        for entry in entries {
            let path = entry.map_err(|e| HarnessError::io(dir, e))?.path();
            if !path.is_file() || path.extension().map(|ext| ext != "js").unwrap_or(true) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path).map_err(|e| HarnessError::io(&path, e))?;
            self.sources.insert(name.to_string(), source);
            loaded += 1;
        }

        debug!(dir = %dir.display(), loaded, "loaded include directory");
        Ok(self)
    }

    /// Add or replace an include
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(name.into(), source.into());
    }

    /// Source text for an include name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }

    /// Source text for an include name, or `UnresolvedInclude`
    pub fn resolve(&self, name: &str) -> HarnessResult<&str> {
        self.get(name).ok_or_else(|| HarnessError::UnresolvedInclude {
            name: name.to_string(),
        })
    }

    /// Check if an include name is known
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Number of known includes
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
