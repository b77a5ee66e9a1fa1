//! CI run configuration.
//!
//! The surrounding CI platform communicates through process environment
//! variables. They are captured exactly once, at startup, into a `CiConfig`
//! that is passed explicitly to every pipeline stage; nothing reads the
//! process environment after that.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration for a single documentation CI run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CiConfig {
    /// Commit under build, if the platform provided one.
    pub commit_sha: Option<String>,

    /// Pull request identifier/URL. Absent for branch builds.
    pub pull_request: Option<String>,

    /// Branch name the job runs on.
    pub branch: Option<String>,

    /// CI job name.
    pub job_name: Option<String>,

    /// Repository checkout root.
    pub repo_root: PathBuf,

    /// Documentation source tree, relative to the repo root.
    pub doc_dir: PathBuf,

    /// Example scripts tree, relative to the repo root.
    pub examples_dir: PathBuf,

    /// Main source tree used for API-reference attribution.
    pub source_dir: PathBuf,

    /// Remote the reference branch is fetched from.
    pub upstream_remote: String,

    /// Reference branch PR diffs are computed against.
    pub default_branch: String,

    /// Base URL of the deployed documentation site.
    pub site_url: String,

    /// Name of the isolated build environment.
    pub env_name: String,

    /// Per-package version overrides, keyed by normalized package name.
    pub pin_overrides: BTreeMap<String, String>,
}

impl CiConfig {
    /// Capture configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build configuration from an explicit variable set.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut env: BTreeMap<String, String> = vars
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .collect();

        let mut pin_overrides = BTreeMap::new();
        for (key, value) in &env {
            // CARGO_* vars leak in when running under cargo; they are not pins.
            if key.starts_with("CARGO") || key.starts_with("CI_") {
                continue;
            }
            if let Some(stem) = key.strip_suffix("_VERSION") {
                pin_overrides.insert(normalize_package_name(stem), value.clone());
            }
        }

        Self {
            commit_sha: env.remove("CI_COMMIT_SHA"),
            pull_request: env.remove("CI_PULL_REQUEST"),
            branch: env.remove("CI_BRANCH"),
            job_name: env.remove("CI_JOB_NAME"),
            repo_root: PathBuf::from("."),
            doc_dir: PathBuf::from("doc"),
            examples_dir: PathBuf::from("examples"),
            source_dir: env
                .remove("CI_SOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("src")),
            upstream_remote: "origin".to_string(),
            default_branch: env
                .remove("CI_DEFAULT_BRANCH")
                .unwrap_or_else(|| "main".to_string()),
            site_url: env
                .remove("CI_SITE_URL")
                .unwrap_or_else(|| "https://docs.example.org".to_string()),
            env_name: "docwright".to_string(),
            pin_overrides,
        }
    }

    /// Whether this run belongs to a pull request.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// Version override for a package, if one was supplied.
    pub fn pin_override(&self, package: &str) -> Option<&str> {
        self.pin_overrides
            .get(&normalize_package_name(package))
            .map(String::as_str)
    }

    /// Diff range between the reference branch and the commit under build.
    pub fn git_range(&self, sha: &str) -> String {
        format!("{}/{}...{}", self.upstream_remote, self.default_branch, sha)
    }

    /// Root of the generated HTML site.
    pub fn html_root(&self) -> PathBuf {
        self.repo_root
            .join(&self.doc_dir)
            .join("_build")
            .join("html")
            .join("stable")
    }

    /// Directory holding generated API-reference pages.
    pub fn generated_api_dir(&self) -> PathBuf {
        self.html_root().join("modules").join("generated")
    }

    /// Path the combined generator output is captured to.
    pub fn build_log(&self) -> PathBuf {
        self.repo_root.join("doc-build.log")
    }

    /// Absolute path of the doc directory.
    pub fn doc_root(&self) -> PathBuf {
        self.repo_root.join(&self.doc_dir)
    }

    /// Rebase the config onto a different checkout root.
    pub fn with_repo_root(mut self, root: &Path) -> Self {
        self.repo_root = root.to_path_buf();
        self
    }
}

/// Normalize a package name or env var stem: lowercase, `_` becomes `-`.
fn normalize_package_name(name: &str) -> String {
    name.to_ascii_lowercase().replace('_', "-")
}
