//! Failure artifact capture
//!
//! When armed, every test or hook failure pulls a forensic bundle from the
//! active automation session: screenshot, DOM snapshot, browser console log,
//! and driver transcript, all under one sanitized file-name stem. Unarmed,
//! every call is a no-op with zero filesystem effects.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use testwright_common::AutomationSession;

use crate::error::RunnerResult;

/// The four bundle extensions, in write order.
const BUNDLE_EXTENSIONS: [&str; 4] = ["png", "html", "browser.txt", "driver.txt"];

/// Arms the failure-artifact capturer.
///
/// Constructed explicitly and scoped to one run; the environment toggles are
/// read only at the process edge via [`ArtifactConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub output_dir: PathBuf,
}

impl ArtifactConfig {
    /// Truthy to arm capture.
    pub const ARM_VAR: &'static str = "TESTWRIGHT_FAILURE_ARTIFACTS";
    /// Directory the bundles land in.
    pub const DIR_VAR: &'static str = "TESTWRIGHT_FAILURE_ARTIFACTS_OUTPUT_DIR";

    /// Read the process-environment toggles. `None` unless the arming
    /// variable is truthy and an output directory is configured.
    pub fn from_env() -> Option<Self> {
        let armed = std::env::var(Self::ARM_VAR)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if !armed {
            return None;
        }
        let dir = std::env::var_os(Self::DIR_VAR)?;
        Some(Self {
            output_dir: PathBuf::from(dir),
        })
    }
}

/// Captures failure bundles from the active automation session.
#[derive(Debug)]
pub struct FailureArtifacts {
    config: Option<ArtifactConfig>,
}

impl FailureArtifacts {
    pub fn new(config: Option<ArtifactConfig>) -> Self {
        Self { config }
    }

    pub fn armed(&self) -> bool {
        self.config.is_some()
    }

    /// Capture the bundle for a failed test or hook.
    ///
    /// Failure reporting must never fail the run: capture problems are
    /// logged at `warn` and swallowed, and a partially written bundle is
    /// removed before returning. With no active session the capture is
    /// skipped silently.
    pub async fn on_failure(
        &self,
        identifier: &str,
        session: Option<&Arc<dyn AutomationSession>>,
    ) {
        let Some(config) = &self.config else {
            return;
        };
        let Some(session) = session else {
            debug!("no active automation session, skipping capture for `{}`", identifier);
            return;
        };
        let stem = sanitize_stem(identifier);
        if let Err(e) = capture_bundle(config, &stem, session.as_ref()).await {
            warn!("failed to capture artifacts for `{}`: {}", identifier, e);
            remove_partial(&config.output_dir, &stem);
        } else {
            debug!("captured failure artifacts `{}` in {}", stem, config.output_dir.display());
        }
    }
}

async fn capture_bundle(
    config: &ArtifactConfig,
    stem: &str,
    session: &dyn AutomationSession,
) -> RunnerResult<()> {
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let screenshot = session.screenshot().await?;
    tokio::fs::write(bundle_path(&config.output_dir, stem, "png"), screenshot).await?;

    let dom = session.page_source().await?;
    tokio::fs::write(bundle_path(&config.output_dir, stem, "html"), dom).await?;

    let browser = session.browser_log().await?;
    tokio::fs::write(
        bundle_path(&config.output_dir, stem, "browser.txt"),
        browser.join("\n"),
    )
    .await?;

    let driver = session.driver_log().await?;
    tokio::fs::write(
        bundle_path(&config.output_dir, stem, "driver.txt"),
        driver.join("\n"),
    )
    .await?;

    Ok(())
}

fn bundle_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}.{}", stem, ext))
}

fn remove_partial(dir: &Path, stem: &str) {
    for ext in BUNDLE_EXTENSIONS {
        let _ = std::fs::remove_file(bundle_path(dir, stem, ext));
    }
}

/// Turn a fully-qualified test/hook identifier into a file-name stem,
/// replacing path-unsafe characters while keeping the name readable.
fn sanitize_stem(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
