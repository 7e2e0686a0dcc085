//! Playwright-backed automation session
//!
//! Drives a long-lived `node` child over a line-delimited JSON protocol: one
//! command out, one reply back. The child owns the browser; this side keeps
//! the command transcript the failure capturer hands out as the driver log.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use testwright_common::AutomationSession;

use crate::discover::{StepDriver, TestStep};
use crate::error::{RunnerError, RunnerResult};

/// Browser engine launched by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(RunnerError::Config(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for the Playwright session.
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Where named `screenshot` steps land.
    pub screenshot_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            screenshot_dir: PathBuf::from("test-results/screenshots"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    ok: bool,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Handle to the running driver child and its browser.
pub struct PlaywrightSession {
    child: parking_lot::Mutex<Child>,
    stdin: tokio::sync::Mutex<ChildStdin>,
    stdout: tokio::sync::Mutex<Lines<BufReader<ChildStdout>>>,
    transcript: parking_lot::Mutex<Vec<String>>,
    screenshot_dir: PathBuf,
    // keeps the generated driver script alive for the child's lifetime
    _workdir: tempfile::TempDir,
}

impl PlaywrightSession {
    /// Spawn the driver child and wait for the browser to come up.
    pub async fn launch(config: PlaywrightConfig) -> RunnerResult<Arc<Self>> {
        Self::check_installed()?;

        let workdir = tempfile::tempdir()?;
        let script_path = workdir.path().join("driver.js");
        std::fs::write(&script_path, driver_script(&config))?;

        debug!("spawning playwright driver: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(workdir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| RunnerError::Session(format!("failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RunnerError::Session("driver child has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::Session("driver child has no stdout".to_string()))?;

        let session = Arc::new(Self {
            child: parking_lot::Mutex::new(child),
            stdin: tokio::sync::Mutex::new(stdin),
            stdout: tokio::sync::Mutex::new(BufReader::new(stdout).lines()),
            transcript: parking_lot::Mutex::new(Vec::new()),
            screenshot_dir: config.screenshot_dir.clone(),
            _workdir: workdir,
        });

        // the driver announces itself once the browser context is ready
        let ready = session.read_reply().await?;
        if ready.as_str() != Some("ready") {
            return Err(RunnerError::Session(format!(
                "unexpected driver greeting: {}",
                ready
            )));
        }
        info!("playwright driver ready ({})", config.browser.as_str());

        Ok(session)
    }

    /// Check that Playwright is installed.
    fn check_installed() -> RunnerResult<()> {
        let status = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(RunnerError::PlaywrightNotFound),
        }
    }

    /// Send one command and wait for its reply.
    async fn command(&self, cmd: Value) -> RunnerResult<Value> {
        let line = serde_json::to_string(&cmd)?;
        self.transcript.lock().push(line.clone());

        {
            let mut stdin = self.stdin.lock().await;
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await?;
        }

        self.read_reply().await
    }

    async fn read_reply(&self) -> RunnerResult<Value> {
        let mut stdout = self.stdout.lock().await;
        let line = stdout
            .next_line()
            .await?
            .ok_or_else(|| RunnerError::Session("driver closed its output".to_string()))?;
        let reply: DriverReply = serde_json::from_str(&line)?;
        if reply.ok {
            Ok(reply.value.unwrap_or(Value::Null))
        } else {
            Err(RunnerError::Session(
                reply.error.unwrap_or_else(|| "unknown driver error".to_string()),
            ))
        }
    }

    /// Ask the driver to close the browser, then stop the child.
    pub async fn shutdown(&self) {
        if let Err(e) = tokio::time::timeout(
            Duration::from_secs(5),
            self.command(json!({ "cmd": "close" })),
        )
        .await
        .map_err(|_| RunnerError::Session("close timed out".to_string()))
        .and_then(|r| r)
        {
            debug!("graceful driver close failed: {}", e);
        }
        self.stop_child();
    }

    fn stop_child(&self) {
        let mut child = self.child.lock();
        if let Some(id) = child.id() {
            debug!("stopping playwright driver (pid: {})", id);

            #[cfg(unix)]
            {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;

                if kill(Pid::from_raw(id as i32), Signal::SIGTERM).is_ok() {
                    std::thread::sleep(Duration::from_millis(200));
                }
            }

            if let Err(e) = child.start_kill() {
                warn!("failed to kill playwright driver: {}", e);
            }
        }
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        self.stop_child();
    }
}

#[async_trait]
impl StepDriver for PlaywrightSession {
    async fn execute(&self, step: &TestStep) -> Result<(), String> {
        match step {
            TestStep::Screenshot { name, full_page } => {
                let value = self
                    .command(json!({ "cmd": "screenshot", "fullPage": full_page }))
                    .await
                    .map_err(|e| e.to_string())?;
                let encoded = value.as_str().ok_or("driver returned no screenshot data")?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| format!("bad screenshot encoding: {}", e))?;
                std::fs::create_dir_all(&self.screenshot_dir).map_err(|e| e.to_string())?;
                let path = self.screenshot_dir.join(format!("{}.png", name));
                std::fs::write(&path, bytes).map_err(|e| e.to_string())?;
                Ok(())
            }
            step => self
                .command(command_for(step))
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
        }
    }
}

#[async_trait]
impl AutomationSession for PlaywrightSession {
    async fn screenshot(&self) -> testwright_common::Result<Vec<u8>> {
        let value = self
            .command(json!({ "cmd": "screenshot", "fullPage": true }))
            .await
            .map_err(|e| testwright_common::Error::Session(e.to_string()))?;
        let encoded = value
            .as_str()
            .ok_or_else(|| testwright_common::Error::Session("no screenshot data".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| testwright_common::Error::Session(e.to_string()))
    }

    async fn page_source(&self) -> testwright_common::Result<String> {
        let value = self
            .command(json!({ "cmd": "content" }))
            .await
            .map_err(|e| testwright_common::Error::Session(e.to_string()))?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn browser_log(&self) -> testwright_common::Result<Vec<String>> {
        let value = self
            .command(json!({ "cmd": "console_log" }))
            .await
            .map_err(|e| testwright_common::Error::Session(e.to_string()))?;
        let entries = value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|v| v.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();
        Ok(entries)
    }

    async fn driver_log(&self) -> testwright_common::Result<Vec<String>> {
        Ok(self.transcript.lock().clone())
    }
}

/// Map a step to its wire command.
fn command_for(step: &TestStep) -> Value {
    match step {
        TestStep::Navigate {
            url,
            wait_for_selector,
        } => json!({ "cmd": "navigate", "url": url, "waitFor": wait_for_selector }),
        TestStep::Click {
            selector,
            timeout_ms,
        } => json!({ "cmd": "click", "selector": selector, "timeoutMs": timeout_ms }),
        TestStep::Fill { selector, value } => {
            json!({ "cmd": "fill", "selector": selector, "value": value })
        }
        TestStep::Wait {
            selector,
            timeout_ms,
        } => json!({ "cmd": "wait", "selector": selector, "timeoutMs": timeout_ms }),
        TestStep::Sleep { ms } => json!({ "cmd": "sleep", "ms": ms }),
        TestStep::Assert {
            selector,
            visible,
            text,
            text_contains,
        } => json!({
            "cmd": "assert",
            "selector": selector,
            "visible": visible,
            "text": text,
            "textContains": text_contains,
        }),
        TestStep::Screenshot { full_page, .. } => {
            json!({ "cmd": "screenshot", "fullPage": full_page })
        }
        TestStep::Evaluate { script } => json!({ "cmd": "evaluate", "script": script }),
    }
}

/// Generate the driver script the node child runs.
fn driver_script(config: &PlaywrightConfig) -> String {
    let mut script = format!(
        r#"const {{ chromium, firefox, webkit }} = require('playwright');
const readline = require('readline');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const baseUrl = '{base_url}';
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
        base_url = config.base_url,
    );
    script.push_str(DRIVER_LOOP);
    script
}

const DRIVER_LOOP: &str = r#"  const page = await context.newPage();
  const consoleLog = [];
  page.on('console', msg => consoleLog.push(`[${msg.type()}] ${msg.text()}`));
  const reply = obj => process.stdout.write(JSON.stringify(obj) + '\n');
  reply({ ok: true, value: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    try {
      const cmd = JSON.parse(line);
      let value = null;
      switch (cmd.cmd) {
        case 'navigate':
          await page.goto(new URL(cmd.url, baseUrl).href);
          if (cmd.waitFor) await page.waitForSelector(cmd.waitFor);
          break;
        case 'click':
          await page.click(cmd.selector, { timeout: cmd.timeoutMs || 5000 });
          break;
        case 'fill':
          await page.fill(cmd.selector, cmd.value);
          break;
        case 'wait':
          await page.waitForSelector(cmd.selector, { state: 'visible', timeout: cmd.timeoutMs });
          break;
        case 'sleep':
          await page.waitForTimeout(cmd.ms);
          break;
        case 'assert': {
          const el = page.locator(cmd.selector);
          if (cmd.visible === true && !(await el.isVisible()))
            throw new Error(`not visible: ${cmd.selector}`);
          if (cmd.visible === false && (await el.isVisible()))
            throw new Error(`unexpectedly visible: ${cmd.selector}`);
          if (cmd.text != null) {
            const t = await el.textContent();
            if (t !== cmd.text) throw new Error(`text mismatch: ${t}`);
          }
          if (cmd.textContains != null) {
            const t = (await el.textContent()) || '';
            if (!t.includes(cmd.textContains)) throw new Error(`text missing: ${cmd.textContains}`);
          }
          break;
        }
        case 'screenshot':
          value = (await page.screenshot({ fullPage: !!cmd.fullPage })).toString('base64');
          break;
        case 'content':
          value = await page.content();
          break;
        case 'console_log':
          value = consoleLog;
          break;
        case 'evaluate':
          value = await page.evaluate(cmd.script);
          break;
        case 'close':
          reply({ ok: true, value: null });
          await browser.close();
          process.exit(0);
        default:
          throw new Error(`unknown command: ${cmd.cmd}`);
      }
      reply({ ok: true, value });
    } catch (error) {
      reply({ ok: false, error: error.message });
    }
  }
  await browser.close();
})();
"#;
