use crate::engine::Fragment;
use crate::error::{HarnessError, HarnessResult};
use crate::fixture::{Fixture, FixtureSource};
use crate::includes::{IncludeTable, ASYNC_INCLUDE, IMPLICIT_INCLUDES};
use crate::metadata::TestMetadata;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Module helpers imported by other fixtures; never run on their own
const MODULE_HELPER_SUFFIX: &str = "_FIXTURE.js";

/// Which fixtures take part in a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    /// Keep fixtures declaring at least one of these features
    pub features: Vec<String>,
    /// Keep fixtures declaring at least one of these flags
    pub flags: Vec<String>,
    /// Drop fixtures declaring any of these features
    pub exclude_features: Vec<String>,
    /// Keep fixtures whose identifier contains this text
    pub path_filter: Option<String>,
}

impl Selection {
    /// Check the identifier before the fixture is read
    pub fn matches_id(&self, id: &str) -> bool {
        self.path_filter
            .as_deref()
            .map(|filter| id.contains(filter))
            .unwrap_or(true)
    }

    /// Check the parsed metadata
    pub fn matches(&self, metadata: &TestMetadata) -> bool {
        if self
            .exclude_features
            .iter()
            .any(|feature| metadata.has_feature(feature))
        {
            return false;
        }
        if !self.features.is_empty()
            && !self.features.iter().any(|feature| metadata.has_feature(feature))
        {
            return false;
        }
        if !self.flags.is_empty() && !self.flags.iter().any(|flag| metadata.flags.contains(flag)) {
            return false;
        }
        true
    }
}

/// Enumerates fixtures under a set of roots and prepares their load lists
#[derive(Debug, Clone)]
pub struct FixtureLoader {
    roots: Vec<PathBuf>,
    includes: Arc<IncludeTable>,
    selection: Selection,
}

impl FixtureLoader {
    /// Create a loader over `roots` resolving includes through `includes`
    pub fn new<I, P>(roots: I, includes: IncludeTable) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            includes: Arc::new(includes),
            selection: Selection::default(),
        }
    }

    /// Restrict the run to a selection
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Configured discovery roots
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Active selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Include table used for resolution
    pub fn includes(&self) -> &IncludeTable {
        &self.includes
    }

    /// Enumerate every fixture file, sorted by identifier
    ///
    /// Fails with `DuplicateFixtureId` when two roots contribute the same
    /// identifier, before anything is read or executed.
    pub fn discover(&self) -> HarnessResult<Vec<FixtureSource>> {
        let mut found: BTreeMap<String, FixtureSource> = BTreeMap::new();

        for root in &self.roots {
            let before = found.len();
            for source in discover_root(root)? {
                if found.contains_key(&source.id) {
                    return Err(HarnessError::DuplicateFixtureId { id: source.id });
                }
                found.insert(source.id.clone(), source);
            }
            debug!(root = %root.display(), count = found.len() - before, "scanned root");
        }

        info!(count = found.len(), roots = self.roots.len(), "discovered fixtures");
        Ok(found.into_values().collect())
    }

    /// Read and parse one discovered fixture
    pub fn load(&self, source: &FixtureSource) -> HarnessResult<Fixture> {
        Fixture::load(source)
    }

    /// Ordered load list: implicit includes, declared includes, then the body
    ///
    /// Repeated include names load once, at their first position.
    pub fn resolve(&self, fixture: &Fixture) -> HarnessResult<Vec<Fragment>> {
        let metadata = &fixture.metadata;
        let mut names: Vec<&str> = Vec::new();

        if !metadata.is_raw() {
            names.extend(IMPLICIT_INCLUDES.iter().copied());
            if metadata.is_async() {
                names.push(ASYNC_INCLUDE);
            }
        }
        names.extend(metadata.includes.iter().map(String::as_str));

        let mut seen = HashSet::new();
        let mut fragments = Vec::with_capacity(names.len() + 1);
        for name in names {
            if !seen.insert(name) {
                continue;
            }
            let source = self.includes.resolve(name)?;
            fragments.push(Fragment::include(name, source));
        }
        fragments.push(Fragment::body(fixture.source.clone()));

        Ok(fragments)
    }

    /// A fresh lazy sequence of loaded fixtures in discovery order
    ///
    /// Per-fixture load failures are yielded alongside the source they came
    /// from; only discovery failures abort the sequence.
    pub fn fixtures(
        &self,
    ) -> HarnessResult<impl Iterator<Item = Result<Fixture, (FixtureSource, HarnessError)>> + '_>
    {
        let sources = self.discover()?;
        Ok(sources
            .into_iter()
            .filter(|source| self.selection.matches_id(&source.id))
            .map(|source| self.load(&source).map_err(|e| (source, e)))
            .filter(|loaded| match loaded {
                Ok(fixture) => self.selection.matches(&fixture.metadata),
                Err(_) => true,
            }))
    }
}

fn discover_root(root: &Path) -> HarnessResult<Vec<FixtureSource>> {
    let metadata = std::fs::metadata(root).map_err(|e| HarnessError::io(root, e))?;
    if metadata.is_file() {
        return Ok(vec![FixtureSource::new(root, root)]);
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            HarnessError::io(path, e.into())
        })?;
        if is_fixture_file(entry.path()) {
            sources.push(FixtureSource::new(root, entry.path()));
        }
    }
    Ok(sources)
}

fn is_fixture_file(path: &Path) -> bool {
    let is_js = path.extension().map(|ext| ext == "js").unwrap_or(false);
    let is_helper = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(MODULE_HELPER_SUFFIX))
        .unwrap_or(false);
    is_js && !is_helper && path.is_file()
}
