//! Testwright orchestrator
//!
//! Selects, executes, and reports on declaratively tagged browser tests:
//! - Filters the discovered test tree by tag expressions and name filter
//! - Supervises per-test retry attempts over the host execution engine
//! - Captures failure artifacts (screenshot, DOM, console and driver logs)
//!   from the attached automation session
//! - Aggregates run statistics and feeds pluggable reporters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Runner (orchestrator)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RunConfig ──▶ select(tags, exprs) ──▶ filtered tree        │
//! │       │                                                     │
//! │       ├── run_test(node) ──▶ retries ──▶ RunStats           │
//! │       │        │ on failure                                 │
//! │       │        ▼                                            │
//! │       │   FailureArtifacts ──▶ {stem}.png / .html /         │
//! │       │        ▲                .browser.txt / .driver.txt  │
//! │       │   AutomationSession (PlaywrightSession)             │
//! │       │                                                     │
//! │       └── Reporter (xunit | json) ──▶ report file           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifacts;
pub mod discover;
pub mod error;
pub mod playwright;
pub mod reporter;
pub mod runner;

pub use artifacts::{ArtifactConfig, FailureArtifacts};
pub use discover::{Discoverer, StepDriver, SuiteSpec, TestStep, YamlDiscoverer};
pub use error::{RunnerError, RunnerResult};
pub use playwright::{Browser, PlaywrightConfig, PlaywrightSession};
pub use reporter::{reporter_by_name, CaseResult, Reporter, RunReport};
pub use runner::{run_tests, RunConfig, Runner};
