//! Git integration for commit and diff inspection.

use std::path::Path;
use std::process::Command;

use crate::error::{DocCiError, Result};

fn run_git(repo_dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .map_err(|e| DocCiError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DocCiError::Git(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or(""),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Capture the HEAD commit SHA from a git repository.
///
/// Runs `git rev-parse HEAD` in the given directory. Returns an error if the
/// directory is not inside a git repository or if git is not available.
pub fn capture_head_sha(repo_dir: &Path) -> Result<String> {
    let sha = run_git(repo_dir, &["rev-parse", "HEAD"])?.trim().to_string();
    if sha.is_empty() {
        return Err(DocCiError::Git(
            "git rev-parse HEAD returned empty output".to_string(),
        ));
    }
    Ok(sha)
}

/// Read the full commit message of a commit.
pub fn commit_message(repo_dir: &Path, sha: &str) -> Result<String> {
    let message = run_git(repo_dir, &["log", "--format=%B", "-n", "1", sha])?;
    let message = message.trim().to_string();
    if message.is_empty() {
        return Err(DocCiError::Git(format!("commit {sha} has no message")));
    }
    Ok(message)
}

/// Fetch a branch from a remote so diff ranges against it resolve.
pub fn fetch_branch(repo_dir: &Path, remote: &str, branch: &str) -> Result<()> {
    run_git(repo_dir, &["fetch", remote, branch]).map(|_| ())
}

/// List files changed in a diff range, one path per entry.
pub fn changed_files(repo_dir: &Path, range: &str) -> Result<Vec<String>> {
    let stdout = run_git(repo_dir, &["diff", "--name-only", range])?;
    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
