//! Result reporting
//!
//! Reporters receive the fully resolved run report after the last node
//! settles. The registry maps the configured reporter name to a writer;
//! options arrive as a `key=value[,key=value]` string, with `output` naming
//! the report path.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use testwright_common::{RunStats, TestStatus};

use crate::error::{RunnerError, RunnerResult};

/// A resolved test case (or synthesized hook failure), as handed to
/// reporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    /// Space-joined suite path.
    pub suite: String,
    pub name: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    /// Body attempts made, including retries. Zero for skips and hook
    /// failures.
    pub attempts: u32,
    pub error: Option<String>,
    /// True when this record is a hook failure attributed to the test it
    /// was running around; such records count no test in the stats.
    #[serde(default)]
    pub hook: bool,
}

impl CaseResult {
    pub fn full_name(&self) -> String {
        if self.suite.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.suite, self.name)
        }
    }
}

/// Full resolved outcome of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub stats: RunStats,
    pub cases: Vec<CaseResult>,
    pub duration_ms: u64,
}

/// Writes a run report somewhere useful.
pub trait Reporter: Send + Sync + std::fmt::Debug {
    fn write(&self, report: &RunReport) -> RunnerResult<()>;
}

/// Look up a reporter by its configured name.
///
/// Unknown names are fatal configuration errors, raised before any node
/// executes. The output path's parent directory is created here so an
/// unwritable location also fails up front.
pub fn reporter_by_name(name: &str, options: Option<&str>) -> RunnerResult<Box<dyn Reporter>> {
    let options = parse_options(options);
    match name {
        "xunit" => Ok(Box::new(XunitReporter::new(output_path(
            &options,
            "test-results.xml",
        )?))),
        "json" => Ok(Box::new(JsonReporter::new(output_path(
            &options,
            "test-results.json",
        )?))),
        other => Err(RunnerError::UnknownReporter(other.to_string())),
    }
}

/// Parse a `key=value[,key=value]` options string.
fn parse_options(raw: Option<&str>) -> HashMap<String, String> {
    let mut options = HashMap::new();
    let Some(raw) = raw else {
        return options;
    };
    for pair in raw.split(',') {
        if let Some((key, value)) = pair.split_once('=') {
            options.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    options
}

fn output_path(options: &HashMap<String, String>, default: &str) -> RunnerResult<PathBuf> {
    let path = options
        .get("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RunnerError::Config(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
    }
    Ok(path)
}

/// Writes an xunit-style XML report.
#[derive(Debug)]
pub struct XunitReporter {
    output: PathBuf,
}

impl XunitReporter {
    pub fn new(output: PathBuf) -> Self {
        Self { output }
    }
}

impl Reporter for XunitReporter {
    fn write(&self, report: &RunReport) -> RunnerResult<()> {
        std::fs::write(&self.output, format_xunit(report))?;
        info!("xunit report written to {}", self.output.display());
        Ok(())
    }
}

fn format_xunit(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<testsuite name=\"testwright\" tests=\"{}\" failures=\"{}\" errors=\"0\" skipped=\"{}\" timestamp=\"{}\" time=\"{:.3}\">\n",
        report.cases.len(),
        report.stats.failures,
        report.stats.pending,
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        report.duration_ms as f64 / 1000.0,
    ));

    for case in &report.cases {
        let classname = escape_xml(&case.suite);
        let name = escape_xml(&case.name);
        let time = case.duration_ms as f64 / 1000.0;
        match case.status {
            TestStatus::Passed => {
                out.push_str(&format!(
                    "  <testcase classname=\"{}\" name=\"{}\" time=\"{:.3}\"/>\n",
                    classname, name, time
                ));
            }
            TestStatus::Failed => {
                let message = escape_xml(case.error.as_deref().unwrap_or("failed"));
                out.push_str(&format!(
                    "  <testcase classname=\"{}\" name=\"{}\" time=\"{:.3}\">\n    <failure message=\"{}\">{}</failure>\n  </testcase>\n",
                    classname, name, time, message, message
                ));
            }
            TestStatus::Skipped | TestStatus::Pending => {
                out.push_str(&format!(
                    "  <testcase classname=\"{}\" name=\"{}\" time=\"{:.3}\">\n    <skipped/>\n  </testcase>\n",
                    classname, name, time
                ));
            }
        }
    }

    out.push_str("</testsuite>\n");
    out
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Writes the report as pretty-printed JSON.
#[derive(Debug)]
pub struct JsonReporter {
    output: PathBuf,
}

impl JsonReporter {
    pub fn new(output: PathBuf) -> Self {
        Self { output }
    }
}

impl Reporter for JsonReporter {
    fn write(&self, report: &RunReport) -> RunnerResult<()> {
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&self.output, json)?;
        info!("json report written to {}", self.output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> RunReport {
        let mut stats = RunStats::default();
        stats.record_pass();
        stats.record_failure();
        stats.record_pending();
        RunReport {
            stats,
            cases: vec![
                CaseResult {
                    suite: "login".to_string(),
                    name: "shows the form".to_string(),
                    status: TestStatus::Passed,
                    duration_ms: 120,
                    attempts: 1,
                    error: None,
                    hook: false,
                },
                CaseResult {
                    suite: "login".to_string(),
                    name: "rejects bad <credentials> & retries".to_string(),
                    status: TestStatus::Failed,
                    duration_ms: 350,
                    attempts: 2,
                    error: Some("expected \"welcome\"".to_string()),
                    hook: false,
                },
                CaseResult {
                    suite: "login".to_string(),
                    name: "legacy flow".to_string(),
                    status: TestStatus::Skipped,
                    duration_ms: 0,
                    attempts: 0,
                    error: None,
                    hook: false,
                },
            ],
            duration_ms: 470,
        }
    }

    #[test]
    fn xunit_output_starts_with_testsuite_root() {
        let xml = format_xunit(&sample_report());
        assert!(xml.starts_with("<testsuite "));
        assert!(xml.ends_with("</testsuite>\n"));
        assert!(xml.contains("tests=\"3\""));
        assert!(xml.contains("failures=\"1\""));
        assert!(xml.contains("skipped=\"1\""));
    }

    #[test]
    fn xunit_escapes_markup_in_names_and_messages() {
        let xml = format_xunit(&sample_report());
        assert!(xml.contains("rejects bad &lt;credentials&gt; &amp; retries"));
        assert!(xml.contains("expected &quot;welcome&quot;"));
        assert!(!xml.contains("<credentials>"));
    }

    #[test]
    fn options_parse_as_key_value_pairs() {
        let options = parse_options(Some("output=/tmp/report.xml, pretty=true"));
        assert_eq!(options.get("output").unwrap(), "/tmp/report.xml");
        assert_eq!(options.get("pretty").unwrap(), "true");
        assert!(parse_options(None).is_empty());
        assert!(parse_options(Some("garbage")).is_empty());
    }

    #[test]
    fn unknown_reporter_is_fatal() {
        let err = reporter_by_name("teamcity", None).unwrap_err();
        assert!(matches!(err, RunnerError::UnknownReporter(_)));
    }
}
