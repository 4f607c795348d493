use crate::error::{HarnessError, HarnessResult};
use crate::harness::DEFAULT_TIMEOUT;
use crate::host::HostConfig;
use crate::loader::Selection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything needed to set up a run
///
/// Usually read from a YAML file and then overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Fixture roots (directories or single files)
    pub roots: Vec<PathBuf>,
    /// Directory of helper includes overlaid on the bundled set
    pub includes_dir: Option<PathBuf>,
    /// Engine binary to run fixtures with
    pub host: HostConfig,
    /// Worker threads; `None` uses the available parallelism
    pub workers: Option<usize>,
    /// Per-fixture timeout in milliseconds
    pub timeout_ms: u64,
    /// Which fixtures take part
    pub selection: Selection,
    /// Run fixtures without a mode flag in both sloppy and strict mode
    pub strict_variants: bool,
    /// Where to write the JSON report, if anywhere
    pub json_report: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            includes_dir: None,
            host: HostConfig::default(),
            workers: None,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            selection: Selection::default(),
            strict_variants: true,
            json_report: None,
        }
    }
}

impl HarnessConfig {
    /// Parse a configuration from YAML text
    pub fn from_yaml(text: &str) -> HarnessResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read a configuration file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Self::from_yaml(&text)
    }

    /// Per-fixture timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> HarnessResult<()> {
        if self.roots.is_empty() {
            return Err(HarnessError::Config("no fixture roots given".into()));
        }
        if self.workers == Some(0) {
            return Err(HarnessError::Config("worker count must be at least 1".into()));
        }
        if self.timeout_ms == 0 {
            return Err(HarnessError::Config("timeout must be greater than zero".into()));
        }
        if self.host.program.trim().is_empty() {
            return Err(HarnessError::Config("host program must not be empty".into()));
        }
        Ok(())
    }
}
