//! The execution driver
//!
//! Walks the selected test tree depth-first in discovery order, supervises
//! per-test retry attempts, runs hook chains, tallies statistics, and routes
//! failure events to the artifact capturer. Execution is strictly
//! serialized: one node resolves, and its artifacts are fully written, before
//! the next node starts.

use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use tracing::{debug, error, info};

use testwright_common::{
    full_name, select, AutomationSession, Hook, RunStats, SuiteNode, TagExpr, TagSet,
    TestContext, TestNode, TestStatus, Verdict,
};

use crate::artifacts::{ArtifactConfig, FailureArtifacts};
use crate::discover::{Discoverer, YamlDiscoverer};
use crate::error::{RunnerError, RunnerResult};
use crate::playwright::{PlaywrightConfig, PlaywrightSession};
use crate::reporter::{reporter_by_name, CaseResult, RunReport};

/// Immutable configuration for one run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Suite spec files or directories.
    pub globs: Vec<String>,

    /// Ordered tag expressions; `!` excludes, a leading `#` is cosmetic.
    pub tag: Vec<String>,

    /// Regex applied to fully-qualified test names.
    pub filter: Option<String>,

    /// Extra attempts granted to a failing test.
    pub retries: u32,

    /// Reporter name (`xunit`, `json`).
    pub reporter: Option<String>,

    /// Reporter options, e.g. `output=reports/run.xml`.
    pub reporter_options: Option<String>,

    /// Arms failure-artifact capture when present.
    pub artifacts: Option<ArtifactConfig>,

    /// Browser session configuration for discovered suites.
    pub playwright: PlaywrightConfig,
}

/// The execution driver for one run.
pub struct Runner {
    selection: Vec<TagExpr>,
    filter: Option<Regex>,
    retries: u32,
    capturer: FailureArtifacts,
    session: Option<Arc<dyn AutomationSession>>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("selection", &self.selection)
            .field("filter", &self.filter)
            .field("retries", &self.retries)
            .field("capturer", &self.capturer)
            .field("session", &self.session.as_ref().map(|_| "<session>"))
            .finish()
    }
}

impl Runner {
    /// Build a driver from the run configuration.
    ///
    /// Tag expressions are parsed here, once; a malformed expression is a
    /// never-matching literal, but an invalid filter regex is fatal.
    pub fn new(config: &RunConfig) -> RunnerResult<Self> {
        let filter = match &config.filter {
            Some(pattern) => Some(Regex::new(pattern).map_err(|source| RunnerError::Filter {
                pattern: pattern.clone(),
                source,
            })?),
            None => None,
        };
        Ok(Self {
            selection: config.tag.iter().map(|raw| TagExpr::parse(raw)).collect(),
            filter,
            retries: config.retries,
            capturer: FailureArtifacts::new(config.artifacts.clone()),
            session: None,
        })
    }

    /// Attach the automation session the capturer queries on failures.
    pub fn with_session(mut self, session: Arc<dyn AutomationSession>) -> Self {
        self.session = Some(session);
        self
    }

    fn context(&self) -> TestContext {
        TestContext {
            session: self.session.clone(),
        }
    }

    /// Execute the selected subset of `suites`, resolving node statuses and
    /// producing the run report.
    pub async fn run(&self, suites: &mut [SuiteNode]) -> RunnerResult<RunReport> {
        let start = Instant::now();
        let total: usize = suites.iter().map(SuiteNode::len).sum();
        info!(
            "running up to {} test(s) across {} suite(s)",
            total,
            suites.len()
        );

        let mut walk = Walk {
            runner: self,
            stats: RunStats::default(),
            cases: Vec::new(),
        };
        for suite in suites.iter_mut() {
            walk.run_suite(suite, Vec::new(), TagSet::new(), false, Vec::new(), Vec::new())
                .await?;
        }

        let Walk { stats, cases, .. } = walk;
        if !stats.is_reconciled() {
            return Err(RunnerError::StatsMismatch {
                tests: stats.tests,
                passes: stats.passes,
                failures: stats.failures,
                pending: stats.pending,
            });
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("");
        info!(
            "Test results: {} passed, {} failed, {} pending ({} ms)",
            stats.passes, stats.failures, stats.pending, duration_ms
        );

        Ok(RunReport {
            stats,
            cases,
            duration_ms,
        })
    }
}

/// Mutable state threaded through one tree walk.
struct Walk<'r> {
    runner: &'r Runner,
    stats: RunStats,
    cases: Vec<CaseResult>,
}

impl Walk<'_> {
    fn run_suite<'a>(
        &'a mut self,
        suite: &'a mut SuiteNode,
        mut path: Vec<String>,
        mut inherited_tags: TagSet,
        inherited_skip: bool,
        mut before: Vec<Hook>,
        inherited_after: Vec<Hook>,
    ) -> BoxFuture<'a, RunnerResult<()>> {
        async move {
            path.push(suite.name.clone());
            inherited_tags.extend(suite.tags.iter().cloned());
            let skip = inherited_skip || suite.skip;

            // setup runs outer-suite-first, teardown innermost-first
            before.extend(suite.before_each.iter().cloned());
            let mut after: Vec<Hook> = suite.after_each.clone();
            after.extend(inherited_after.iter().cloned());

            for test in suite.tests.iter_mut() {
                self.run_test(test, &path, &inherited_tags, skip, &before, &after)
                    .await;
            }
            for child in suite.suites.iter_mut() {
                self.run_suite(
                    child,
                    path.clone(),
                    inherited_tags.clone(),
                    skip,
                    before.clone(),
                    after.clone(),
                )
                .await?;
            }
            Ok(())
        }
        .boxed()
    }

    async fn run_test(
        &mut self,
        test: &mut TestNode,
        path: &[String],
        suite_tags: &TagSet,
        inherited_skip: bool,
        before: &[Hook],
        after: &[Hook],
    ) {
        let mut effective = suite_tags.clone();
        effective.extend(test.tags.iter().cloned());
        if !select(&effective, &self.runner.selection) {
            return;
        }

        let name = full_name(path, &test.name);
        if let Some(filter) = &self.runner.filter {
            if !filter.is_match(&name) {
                return;
            }
        }

        if inherited_skip || test.skip {
            test.status = TestStatus::Skipped;
            self.stats.record_pending();
            info!("- {} (skipped)", name);
            self.push_case(path, test, 0, 0, None, false);
            return;
        }

        let ctx = self.runner.context();

        // a setup failure aborts the test without resolving it: one more
        // failure, no test counted, artifacts attributed to the covered test
        for hook in before {
            if let Err(reason) = hook.invoke(ctx.clone()).await {
                self.hook_failure(path, test, hook, &name, reason).await;
                return;
            }
        }

        let start = Instant::now();
        let mut attempts = 0u32;
        let verdict = loop {
            attempts += 1;
            match test.invoke(ctx.clone()).await {
                Verdict::Fail(reason) if attempts <= self.runner.retries => {
                    debug!("retrying {} (attempt {} failed: {})", name, attempts, reason);
                }
                verdict => break verdict,
            }
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match verdict {
            Verdict::Pass => {
                test.status = TestStatus::Passed;
                self.stats.record_pass();
                info!("✓ {} ({} ms)", name, duration_ms);
                self.push_case(path, test, duration_ms, attempts, None, false);
            }
            Verdict::Skip => {
                test.status = TestStatus::Skipped;
                self.stats.record_pending();
                info!("- {} (skipped)", name);
                self.push_case(path, test, duration_ms, attempts, None, false);
            }
            Verdict::Fail(reason) => {
                test.status = TestStatus::Failed;
                self.stats.record_failure();
                error!("✗ {} - {}", name, reason);
                self.runner
                    .capturer
                    .on_failure(&name, self.runner.session.as_ref())
                    .await;
                self.push_case(path, test, duration_ms, attempts, Some(reason), false);
            }
        }

        // teardown failures are recorded but never undo the test's outcome
        for hook in after {
            if let Err(reason) = hook.invoke(ctx.clone()).await {
                self.hook_failure(path, test, hook, &name, reason).await;
            }
        }
    }

    async fn hook_failure(
        &mut self,
        path: &[String],
        test: &TestNode,
        hook: &Hook,
        name: &str,
        reason: String,
    ) {
        error!("✗ {} ({} hook) - {}", name, hook.label, reason);
        self.stats.record_hook_failure();
        self.runner
            .capturer
            .on_failure(name, self.runner.session.as_ref())
            .await;
        self.cases.push(CaseResult {
            suite: path.join(" "),
            name: test.name.clone(),
            status: TestStatus::Failed,
            duration_ms: 0,
            attempts: 0,
            error: Some(reason),
            hook: true,
        });
    }

    fn push_case(
        &mut self,
        path: &[String],
        test: &TestNode,
        duration_ms: u64,
        attempts: u32,
        error: Option<String>,
        hook: bool,
    ) {
        self.cases.push(CaseResult {
            suite: path.join(" "),
            name: test.name.clone(),
            status: test.status,
            duration_ms,
            attempts,
            error,
            hook,
        });
    }
}

/// Discover, select, execute, and report: the embedding entry point.
///
/// Resolves the reporter and filter before anything runs, launches the
/// Playwright session the discovered suites drive, and hands back the final
/// statistics. Configuration errors surface before any node executes.
pub async fn run_tests(config: RunConfig) -> RunnerResult<RunStats> {
    let reporter = match &config.reporter {
        Some(name) => Some(reporter_by_name(name, config.reporter_options.as_deref())?),
        None => None,
    };
    let runner = Runner::new(&config)?;

    let session = PlaywrightSession::launch(config.playwright.clone()).await?;
    let discoverer = YamlDiscoverer::new(session.clone());
    let discovered = discoverer.discover(&config.globs);

    let result = match discovered {
        Ok(mut suites) => {
            runner
                .with_session(session.clone())
                .run(&mut suites)
                .await
        }
        Err(e) => Err(e),
    };
    session.shutdown().await;
    let report = result?;

    if let Some(reporter) = &reporter {
        reporter.write(&report)?;
    }
    Ok(report.stats)
}
