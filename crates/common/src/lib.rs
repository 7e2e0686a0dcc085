//! Testwright Common Library
//!
//! Shared leaf types for the testwright orchestrator: the discovered test
//! tree, tag metadata and the selection engine, run statistics, and the
//! automation-session boundary consumed by failure-artifact capture.

pub mod error;
pub mod session;
pub mod stats;
pub mod tags;
pub mod tree;

// Re-export commonly used types
pub use error::{Error, Result};
pub use session::AutomationSession;
pub use stats::RunStats;
pub use tags::{select, tag_set, Tag, TagExpr, TagSet};
pub use tree::{full_name, Hook, SuiteNode, TestContext, TestNode, TestStatus, Verdict};

/// Testwright version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
