//! In-memory fakes for external tools (testing only)
//!
//! Provides `ScriptedRunner`, a `ToolRunner` that answers from a canned
//! response table instead of spawning processes, and records every command
//! it was asked to run.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::exec::{CmdOutput, CmdSpec, ToolRunner};

/// Scripted `ToolRunner` for tests.
///
/// Responses are keyed by the command's `name`. Commands without a scripted
/// response succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, CmdOutput>>,
    calls: Mutex<Vec<CmdSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful response with the given stdout.
    pub fn succeed_with(&self, name: &str, stdout: &str) {
        self.responses.lock().unwrap().insert(
            name.to_string(),
            CmdOutput {
                exit_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
                duration_ms: 1,
                success: true,
            },
        );
    }

    /// Script a failure with the given exit code and stderr.
    pub fn fail_with(&self, name: &str, exit_code: i32, stderr: &str) {
        self.responses.lock().unwrap().insert(
            name.to_string(),
            CmdOutput {
                exit_code,
                stdout: String::new(),
                stderr: stderr.to_string(),
                duration_ms: 1,
                success: false,
            },
        );
    }

    /// Every command spec this runner has been asked to execute, in order.
    pub fn calls(&self) -> Vec<CmdSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Specs whose name matches `name`.
    pub fn calls_named(&self, name: &str) -> Vec<CmdSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.name == name)
            .collect()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, spec: &CmdSpec) -> Result<CmdOutput> {
        self.calls.lock().unwrap().push(spec.clone());

        let scripted = self.responses.lock().unwrap().get(&spec.name).cloned();
        Ok(scripted.unwrap_or(CmdOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 1,
            success: true,
        }))
    }
}
