//! Command-line interface definition

use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use clap::Parser;
use std::path::PathBuf;

/// Exit code when every selected fixture passed
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when at least one fixture did not pass
pub const EXIT_FAILURES: i32 = 1;
/// Exit code when the harness itself could not run
pub const EXIT_SETUP_ERROR: i32 = 2;

/// Run conformance fixtures against an engine binary
#[derive(Parser, Debug)]
#[command(name = "run_conformance")]
#[command(about = "Run test262-style conformance fixtures against a JavaScript engine", long_about = None)]
pub struct Cli {
    /// Fixture roots (directories or single files)
    pub roots: Vec<PathBuf>,

    /// YAML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory of helper includes (e.g. test262's harness/)
    #[arg(long)]
    pub includes_dir: Option<PathBuf>,

    /// Engine executable
    #[arg(long)]
    pub host: Option<String>,

    /// Argument passed to the engine before the script path (repeatable)
    #[arg(long = "host-arg", allow_hyphen_values = true)]
    pub host_args: Vec<String>,

    /// Argument for the engine's syntax-only check (repeatable)
    #[arg(long = "check-arg", allow_hyphen_values = true)]
    pub check_args: Vec<String>,

    /// The engine has no syntax-only mode
    #[arg(long, conflicts_with = "check_args")]
    pub no_check: bool,

    /// Only run fixtures declaring this feature (repeatable)
    #[arg(long = "feature")]
    pub features: Vec<String>,

    /// Only run fixtures declaring this flag (repeatable)
    #[arg(long = "flag")]
    pub flags: Vec<String>,

    /// Skip fixtures declaring this feature (repeatable)
    #[arg(long = "exclude-feature")]
    pub exclude_features: Vec<String>,

    /// Only run fixtures whose id contains this text
    #[arg(long)]
    pub filter: Option<String>,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Per-fixture timeout in milliseconds, shared by all of its run modes
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Run unflagged fixtures in sloppy mode only
    #[arg(long)]
    pub no_strict_variants: bool,

    /// Write the JSON report to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Build the run configuration: config file first, then flags on top
    pub fn to_config(&self) -> HarnessResult<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_yaml_file(path)?,
            None => HarnessConfig::default(),
        };

        if !self.roots.is_empty() {
            config.roots = self.roots.clone();
        }
        if let Some(dir) = &self.includes_dir {
            config.includes_dir = Some(dir.clone());
        }
        if let Some(host) = &self.host {
            config.host.program = host.clone();
        }
        if !self.host_args.is_empty() {
            config.host.args = self.host_args.clone();
        }
        if self.no_check {
            config.host.check_args = None;
        } else if !self.check_args.is_empty() {
            config.host.check_args = Some(self.check_args.clone());
        }
        if !self.features.is_empty() {
            config.selection.features = self.features.clone();
        }
        if !self.flags.is_empty() {
            config.selection.flags = self.flags.clone();
        }
        if !self.exclude_features.is_empty() {
            config.selection.exclude_features = self.exclude_features.clone();
        }
        if let Some(filter) = &self.filter {
            config.selection.path_filter = Some(filter.clone());
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if self.no_strict_variants {
            config.strict_variants = false;
        }
        if let Some(json) = &self.json {
            config.json_report = Some(json.clone());
        }

        config.validate()?;
        Ok(config)
    }
}
