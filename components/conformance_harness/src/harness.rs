use crate::classifier::{classify, combine, Verdict};
use crate::engine::{Engine, Fragment, RunMode};
use crate::error::{EngineError, HarnessResult};
use crate::fixture::{Fixture, FixtureSource};
use crate::loader::FixtureLoader;
use crate::metadata::Expectation;
use crate::report::TestReport;
use crate::sandbox::{modes_for, Sandbox};
use crossbeam::channel::{self, RecvTimeoutError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default per-fixture timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra wait beyond the deadline, so engines that honour the deadline
/// report their own timeout before the sandbox is abandoned
const ABANDON_GRACE: Duration = Duration::from_millis(250);

/// Result of running one discovered fixture
#[derive(Debug)]
struct Finished {
    index: usize,
    id: String,
    /// `None` when the selection excluded the fixture
    verdict: Option<Verdict>,
}

/// Conformance harness: runs fixtures against an engine on a worker pool
pub struct ConformanceHarness<E: Engine + 'static> {
    engine: Arc<E>,
    workers: usize,
    timeout: Duration,
    strict_variants: bool,
    abandoned: Arc<Mutex<BTreeSet<String>>>,
}

impl<E: Engine + 'static> ConformanceHarness<E> {
    /// Create a harness with one worker per available CPU
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            workers: default_workers(),
            timeout: DEFAULT_TIMEOUT,
            strict_variants: true,
            abandoned: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// Set the number of worker threads (at least one)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the timeout for each fixture, shared by all of its run modes
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run fixtures without a mode flag in both sloppy and strict mode
    pub fn with_strict_variants(mut self, enabled: bool) -> Self {
        self.strict_variants = enabled;
        self
    }

    /// Engine under test
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Per-fixture timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fixtures whose abandoned sandboxes are still running
    pub fn abandoned_sandboxes(&self) -> Vec<String> {
        self.abandoned.lock().iter().cloned().collect()
    }

    /// Run every fixture the loader discovers
    ///
    /// Discovery faults and duplicate identifiers abort the run. Per-fixture
    /// faults become verdicts. The report lists verdicts in discovery order
    /// whatever order the workers finish in.
    pub fn run(&self, loader: &FixtureLoader) -> HarnessResult<TestReport> {
        let sources = loader.discover()?;
        let started = Instant::now();
        info!(
            fixtures = sources.len(),
            workers = self.workers,
            engine = self.engine.name(),
            "starting run"
        );

        let (job_tx, job_rx) = channel::bounded::<(usize, FixtureSource)>(self.workers * 2);
        let (result_tx, result_rx) = channel::unbounded::<Finished>();

        let report = thread::scope(move |scope| -> HarnessResult<TestReport> {
            for _ in 0..self.workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (index, source) in job_rx {
                        let verdict = self.run_source(loader, &source);
                        let finished = Finished {
                            index,
                            id: source.id,
                            verdict,
                        };
                        if result_tx.send(finished).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(result_tx);

            scope.spawn(move || {
                for job in sources.into_iter().enumerate() {
                    if job_tx.send(job).is_err() {
                        break;
                    }
                }
            });

            let mut report = TestReport::new();
            let mut pending = BTreeMap::new();
            let mut next = 0usize;
            for finished in result_rx.iter() {
                pending.insert(finished.index, finished);
                while let Some(finished) = pending.remove(&next) {
                    next += 1;
                    match finished.verdict {
                        Some(verdict) => report.add_result(&finished.id, verdict)?,
                        None => report.record_filtered(),
                    }
                }
            }
            Ok(report)
        })?;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            summary = %report.summary(),
            "run finished"
        );
        let abandoned = self.abandoned.lock().len();
        if abandoned > 0 {
            warn!(abandoned, "sandboxes still running after their timeout");
        }

        Ok(report)
    }

    /// Run a fixture that is already loaded
    pub fn run_fixture(&self, loader: &FixtureLoader, fixture: Fixture) -> Verdict {
        let fragments = match loader.resolve(&fixture) {
            Ok(fragments) => fragments,
            Err(e) => return Verdict::Error(e.to_string()),
        };
        self.run_fragments(fixture, fragments)
    }

    /// Run a fixture with an explicit load list in every mode it requires
    ///
    /// The timeout covers the fixture as a whole, across all of its modes.
    pub fn run_fragments(&self, fixture: Fixture, fragments: Vec<Fragment>) -> Verdict {
        let modes = modes_for(&fixture.metadata, self.strict_variants);
        let expectation = fixture.metadata.expectation();
        let deadline = Instant::now() + self.timeout;
        let fixture = Arc::new(fixture);
        let fragments = Arc::new(fragments);

        let mut verdicts = Vec::with_capacity(modes.len());
        for mode in modes {
            let verdict = self.run_mode(&fixture, &fragments, mode, &expectation, deadline);
            let stop = !verdict.is_pass();
            verdicts.push((mode, verdict));
            if stop {
                break;
            }
        }

        let verdict = combine(verdicts);
        debug!(id = %fixture.id, verdict = %verdict, "fixture finished");
        verdict
    }

    fn run_source(&self, loader: &FixtureLoader, source: &FixtureSource) -> Option<Verdict> {
        if !loader.selection().matches_id(&source.id) {
            return None;
        }
        let fixture = match loader.load(source) {
            Ok(fixture) => fixture,
            Err(e) => {
                debug!(id = %source.id, error = %e, "fixture failed to load");
                return Some(Verdict::Error(e.to_string()));
            }
        };
        if !loader.selection().matches(&fixture.metadata) {
            return None;
        }
        Some(self.run_fixture(loader, fixture))
    }

    /// Evaluate one mode on a helper thread, abandoning it past the deadline
    fn run_mode(
        &self,
        fixture: &Arc<Fixture>,
        fragments: &Arc<Vec<Fragment>>,
        mode: RunMode,
        expectation: &Expectation,
        deadline: Instant,
    ) -> Verdict {
        let (tx, rx) = channel::bounded(1);
        let engine = Arc::clone(&self.engine);
        let abandoned = Arc::clone(&self.abandoned);
        let fixture_ref = Arc::clone(fixture);
        let fragments = Arc::clone(fragments);

        let spawned = thread::Builder::new()
            .name(format!("sandbox-{}", fixture.name()))
            .spawn(move || {
                let sandbox = Sandbox::new(engine.as_ref());
                let result = sandbox.run(&fixture_ref.metadata, &fragments, mode, Some(deadline));
                let _ = tx.send(result);
                abandoned.lock().remove(&fixture_ref.id);
            });
        if let Err(e) = spawned {
            return Verdict::Error(format!("cannot start sandbox thread: {}", e));
        }

        let wait = deadline.saturating_duration_since(Instant::now()) + ABANDON_GRACE;
        match rx.recv_timeout(wait) {
            Ok(Ok(completion)) => classify(expectation, &completion),
            Ok(Err(EngineError::Timeout)) => Verdict::Timeout,
            Ok(Err(e)) => Verdict::Error(e.to_string()),
            Err(RecvTimeoutError::Timeout) => {
                warn!(id = %fixture.id, ?mode, "abandoning sandbox after timeout");
                self.abandoned.lock().insert(fixture.id.clone());
                // The sandbox may have finished while the entry was being added
                if rx.try_recv().is_ok() {
                    self.abandoned.lock().remove(&fixture.id);
                }
                Verdict::Timeout
            }
            Err(RecvTimeoutError::Disconnected) => {
                Verdict::Error("sandbox ended without reporting a completion".to_string())
            }
        }
    }
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
