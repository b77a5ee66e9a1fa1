//! External command execution.
//!
//! Every tool the pipeline shells out to (package installer, environment
//! manager, documentation generator) goes through the `ToolRunner` trait so
//! tests can substitute a scripted fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

use crate::error::{DocCiError, Result};

/// Specification of a single external command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CmdSpec {
    /// Short name used in logs and error messages.
    pub name: String,

    /// Executable to run.
    pub program: String,

    /// Arguments.
    pub args: Vec<String>,

    /// Working directory, if different from the process cwd.
    pub cwd: Option<PathBuf>,

    /// Extra environment variables.
    pub envs: Vec<(String, String)>,

    /// Timeout in seconds. Zero disables the timeout.
    pub timeout_secs: u64,
}

impl CmdSpec {
    /// Create a command spec with no cwd, env, or timeout.
    pub fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: None,
            envs: Vec::new(),
            timeout_secs: 0,
        }
    }

    /// Set the working directory.
    pub fn in_dir(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Captured result of an executed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmdOutput {
    /// Exit code (0 = success, -1 = terminated without a code).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the command exited successfully.
    pub success: bool,
}

impl CmdOutput {
    /// Stdout followed by stderr, as written to build logs.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Async runner for external commands.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Execute a command to completion, capturing its output.
    ///
    /// A non-zero exit status is not an error at this layer; callers decide
    /// what a failure means for their stage.
    async fn run(&self, spec: &CmdSpec) -> Result<CmdOutput>;
}

/// `ToolRunner` backed by real child processes.
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, spec: &CmdSpec) -> Result<CmdOutput> {
        let start = Instant::now();

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &spec.envs {
            command.env(key, value);
        }

        let child = command.spawn().map_err(|e| DocCiError::Spawn {
            program: spec.program.clone(),
            source: e,
        })?;

        let output = if spec.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(spec.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| DocCiError::Timeout {
                name: spec.name.clone(),
                timeout_secs: spec.timeout_secs,
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(CmdOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_spec_builder() {
        let spec = CmdSpec::new("apt_install", "apt-get", &["install", "-yq", "optipng"])
            .env("DEBIAN_FRONTEND", "noninteractive")
            .timeout(600);

        assert_eq!(spec.program, "apt-get");
        assert_eq!(spec.args[0], "install");
        assert_eq!(spec.timeout_secs, 600);
        assert_eq!(spec.envs[0].0, "DEBIAN_FRONTEND");
    }

    #[test]
    fn test_combined_output_joins_streams() {
        let output = CmdOutput {
            exit_code: 0,
            stdout: "building".to_string(),
            stderr: "WARNING: bad ref".to_string(),
            duration_ms: 1,
            success: true,
        };
        assert_eq!(output.combined(), "building\nWARNING: bad ref");
    }

    #[tokio::test]
    async fn test_process_runner_captures_stdout() {
        let spec = CmdSpec::new("echo_test", "echo", &["hello"]);
        let output = ProcessRunner.run(&spec).await.expect("run failed");
        assert!(output.success);
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_process_runner_nonzero_exit_is_not_an_error() {
        let spec = CmdSpec::new("false_test", "false", &[]);
        let output = ProcessRunner.run(&spec).await.expect("run failed");
        assert!(!output.success);
        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_process_runner_missing_program_is_spawn_error() {
        let spec = CmdSpec::new("nope", "docwright-no-such-binary", &[]);
        let err = ProcessRunner.run(&spec).await.unwrap_err();
        assert!(matches!(err, DocCiError::Spawn { .. }));
    }
}
