//! Conformance Test Harness
//!
//! Runs test262-style fixtures (scripts with a YAML front-matter block) against
//! a JavaScript engine and classifies each outcome against the expectation the
//! fixture declares.
//!
//! The pipeline is one-directional: [`FixtureLoader`] discovers fixtures and
//! resolves their helper includes, a [`Sandbox`] evaluates each one in a fresh
//! engine context, [`classify`] turns the completion into a [`Verdict`], and a
//! [`TestReport`] records verdicts in discovery order. [`ConformanceHarness`]
//! drives the pipeline on a worker pool.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod harness;
pub mod host;
pub mod includes;
pub mod loader;
pub mod logging;
pub mod metadata;
pub mod report;
pub mod sandbox;

pub use classifier::{classify, combine, Verdict};
pub use cli::Cli;
pub use config::HarnessConfig;
pub use engine::{
    CompileFailure, Completion, ContextOptions, Engine, Fragment, FragmentKind, Phase, RunMode,
    Thrown,
};
pub use error::{EngineError, HarnessError, HarnessResult};
pub use fixture::{Fixture, FixtureSource};
pub use harness::ConformanceHarness;
pub use host::{HostConfig, HostEngine};
pub use includes::IncludeTable;
pub use loader::{FixtureLoader, Selection};
pub use metadata::{Expectation, NegativeExpectation, TestMetadata};
pub use report::{ReportEntry, TestReport};
pub use sandbox::{modes_for, Sandbox};
