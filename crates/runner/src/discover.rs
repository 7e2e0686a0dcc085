//! Declarative YAML suite discovery
//!
//! Each YAML file defines one suite: a name, optional tags and skip flag,
//! and a list of tests whose bodies are browser steps. Discovery binds the
//! steps to a [`StepDriver`] and hands the orchestrator an owned tree;
//! anything beyond this simple file scan is the discovery collaborator's
//! concern, not the core's.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use testwright_common::{tag_set, SuiteNode, TestNode, Verdict};

use crate::error::{RunnerError, RunnerResult};

/// A single browser step in a declarative test body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to the session base URL)
    Navigate {
        url: String,
        #[serde(default)]
        wait_for_selector: Option<String>,
    },

    /// Click an element
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Fill an input field
    Fill { selector: String, value: String },

    /// Wait for an element to become visible
    Wait {
        selector: String,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Assert something about an element
    Assert {
        selector: String,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
    },

    /// Take a named screenshot
    Screenshot {
        name: String,
        #[serde(default)]
        full_page: bool,
    },

    /// Execute custom JavaScript in the page
    Evaluate { script: String },
}

fn default_wait_timeout() -> u64 {
    5000
}

/// Executes one browser step on behalf of a discovered test body.
///
/// Failures come back as plain messages, the shape the execution driver
/// records and reports.
#[async_trait]
pub trait StepDriver: Send + Sync {
    async fn execute(&self, step: &TestStep) -> Result<(), String>;
}

/// One suite file, as parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSpec {
    pub suite: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub skip: bool,

    pub tests: Vec<CaseSpec>,
}

/// One test entry inside a suite file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSpec {
    pub name: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub steps: Vec<TestStep>,
}

impl SuiteSpec {
    /// Parse a suite spec from a YAML string.
    pub fn from_yaml(yaml: &str) -> RunnerResult<Self> {
        serde_yaml::from_str(yaml).map_err(RunnerError::from)
    }

    /// Parse a suite spec from a YAML file.
    pub fn from_file(path: &Path) -> RunnerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::SpecParse(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }
}

/// Supplies suite trees for a set of glob patterns.
pub trait Discoverer {
    fn discover(&self, globs: &[String]) -> RunnerResult<Vec<SuiteNode>>;
}

/// Loads YAML suite files and binds their step bodies to a step driver.
pub struct YamlDiscoverer {
    driver: Arc<dyn StepDriver>,
}

impl YamlDiscoverer {
    pub fn new(driver: Arc<dyn StepDriver>) -> Self {
        Self { driver }
    }

    /// Resolve one pattern to an ordered list of spec files.
    ///
    /// A file loads directly; a directory (or a pattern with a wildcard
    /// tail) is walked for `*.yaml`/`*.yml` in file-name order.
    fn resolve_pattern(&self, pattern: &str) -> RunnerResult<Vec<PathBuf>> {
        let path = Path::new(pattern);
        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }

        let root = if path.is_dir() {
            path.to_path_buf()
        } else {
            static_prefix(pattern)
        };
        if !root.is_dir() {
            return Err(RunnerError::Config(format!(
                "glob pattern matched nothing: {}",
                pattern
            )));
        }

        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(RunnerError::Config(format!(
                "glob pattern matched nothing: {}",
                pattern
            )));
        }
        Ok(files)
    }

    fn build_suite(&self, spec: SuiteSpec) -> SuiteNode {
        let mut suite = SuiteNode::new(spec.suite);
        suite.tags = tag_set(spec.tags.iter().map(String::as_str));
        suite.skip = spec.skip;

        for case in spec.tests {
            let steps = Arc::new(case.steps);
            let driver = Arc::clone(&self.driver);
            let mut test = TestNode::new(case.name, move |_ctx| {
                let steps = Arc::clone(&steps);
                let driver = Arc::clone(&driver);
                async move {
                    for step in steps.iter() {
                        if let Err(reason) = driver.execute(step).await {
                            return Verdict::Fail(reason);
                        }
                    }
                    Verdict::Pass
                }
            });
            test.tags = tag_set(case.tags.iter().map(String::as_str));
            test.skip = case.skip;
            suite.tests.push(test);
        }
        suite
    }
}

impl Discoverer for YamlDiscoverer {
    fn discover(&self, globs: &[String]) -> RunnerResult<Vec<SuiteNode>> {
        let mut suites = Vec::new();
        for pattern in globs {
            for file in self.resolve_pattern(pattern)? {
                debug!("loading suite spec {}", file.display());
                let spec = SuiteSpec::from_file(&file)?;
                suites.push(self.build_suite(spec));
            }
        }
        Ok(suites)
    }
}

/// Leading path components before the first wildcard.
fn static_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains('*') || text.contains('?') {
            break;
        }
        prefix.push(component);
    }
    prefix
}
