//! Docwright Core - shared infrastructure for the docwright CI helper
//!
//! Provides the pieces every stage of the pipeline leans on:
//! - `CiConfig`: process environment captured once at startup
//! - git integration for commit/diff inspection
//! - `ToolRunner`: async external command execution with timeouts
//! - the `DocCiError` taxonomy
//! - tracing initialisation

pub mod config;
pub mod error;
pub mod exec;
pub mod fakes;
pub mod git;
pub mod telemetry;

// Re-export key types
pub use config::CiConfig;
pub use error::{DocCiError, Result};
pub use exec::{CmdOutput, CmdSpec, ProcessRunner, ToolRunner};
pub use telemetry::init_tracing;
