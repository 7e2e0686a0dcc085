//! Automation-session boundary
//!
//! The capture-side surface of an attached browser/automation session. The
//! orchestrator pulls diagnostics through this trait only after a failure;
//! driving the browser is the session implementation's own business.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait AutomationSession: Send + Sync {
    /// PNG screenshot of the current page.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Serialized DOM of the current page.
    async fn page_source(&self) -> Result<String>;

    /// Accumulated browser-side console entries.
    async fn browser_log(&self) -> Result<Vec<String>>;

    /// Accumulated driver-side command transcript.
    async fn driver_log(&self) -> Result<Vec<String>>;
}
