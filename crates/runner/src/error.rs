//! Error types for the orchestrator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown reporter: {0}")]
    UnknownReporter(String),

    #[error("Invalid name filter `{pattern}`: {source}")]
    Filter {
        pattern: String,
        source: regex::Error,
    },

    #[error("Suite spec error: {0}")]
    SpecParse(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Automation session error: {0}")]
    Session(String),

    #[error("Run interrupted before completion")]
    Interrupted,

    #[error("Run statistics failed to reconcile: tests={tests} passes={passes} failures={failures} pending={pending}")]
    StatsMismatch {
        tests: usize,
        passes: usize,
        failures: usize,
        pending: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Common(#[from] testwright_common::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
