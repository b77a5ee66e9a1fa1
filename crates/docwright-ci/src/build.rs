//! Documentation build invocation.
//!
//! Translates the classifier's verdict into generator flags, runs the
//! build, captures its combined output to the log file, and patches the
//! generated pages with the version-warning script.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

use docwright_core::{CiConfig, CmdOutput, CmdSpec, DocCiError, Result, ToolRunner};

use crate::classify::BuildKind;

/// Release branches (`0.21.X`, `1.4.X`, ...) publish the packaged site.
fn release_branch_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+\.[0-9]+\.X$").expect("release branch pattern is valid"))
}

/// Always pass `-T` so generator exceptions come with full tracebacks.
const SPHINX_OPTS: &str = "-T";

/// Generator make target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MakeTarget {
    /// Full HTML build.
    Html,

    /// HTML build without executing plot-generating examples.
    HtmlNoPlot,

    /// Packaged site for deployment from the main or a release branch.
    Dist,
}

impl MakeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            MakeTarget::Html => "html",
            MakeTarget::HtmlNoPlot => "html-noplot",
            MakeTarget::Dist => "dist",
        }
    }
}

/// Concrete flags for one generator invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildPlan {
    pub target: MakeTarget,

    /// Restriction pattern for example execution, pattern builds only.
    pub examples_pattern: Option<String>,
}

impl BuildPlan {
    /// Derive the invocation from the classifier's verdict.
    ///
    /// Returns `None` for skip verdicts. Outside pull requests, builds on
    /// the default branch or a release branch always produce the packaged
    /// `dist` target, whatever the verdict said.
    pub fn from_kind(kind: &BuildKind, config: &CiConfig) -> Option<Self> {
        let mut plan = match kind {
            BuildKind::Skip { .. } => return None,
            BuildKind::Quick { .. } => Self {
                target: MakeTarget::HtmlNoPlot,
                examples_pattern: None,
            },
            BuildKind::Full { .. } => Self {
                target: MakeTarget::Html,
                examples_pattern: None,
            },
            BuildKind::FullPattern { pattern, .. } => Self {
                target: MakeTarget::Html,
                examples_pattern: Some(pattern.clone()),
            },
        };

        if !config.is_pull_request() && is_deploy_branch(config) {
            plan = Self {
                target: MakeTarget::Dist,
                examples_pattern: None,
            };
        }

        Some(plan)
    }
}

fn is_deploy_branch(config: &CiConfig) -> bool {
    match config.branch.as_deref() {
        Some(branch) => {
            branch == config.default_branch || release_branch_regex().is_match(branch)
        }
        None => false,
    }
}

/// Runs the documentation generator.
pub struct DocBuilder;

impl DocBuilder {
    /// Invoke the generator once and capture its output to the build log.
    ///
    /// The log is written whether or not the build succeeds so the reporter
    /// and the operator can inspect it. A non-zero generator exit becomes
    /// the run's failure.
    pub async fn build(
        runner: &dyn ToolRunner,
        config: &CiConfig,
        plan: &BuildPlan,
    ) -> Result<CmdOutput> {
        let mut spec = CmdSpec::new("doc_build", "make", &[plan.target.as_str()])
            .in_dir(config.doc_root())
            .env("SPHINXOPTS", SPHINX_OPTS);
        if let Some(pattern) = &plan.examples_pattern {
            spec = spec.env("EXAMPLES_PATTERN", pattern);
        }

        info!(target = plan.target.as_str(), "building documentation");
        let output = runner.run(&spec).await?;

        let log_path = config.build_log();
        std::fs::write(&log_path, output.combined())?;
        info!(log = %log_path.display(), duration_ms = output.duration_ms, "generator finished");

        if !output.success {
            return Err(DocCiError::Build {
                exit_code: output.exit_code,
                log: log_path,
            });
        }
        Ok(output)
    }

    /// Inject the version-warning script into every generated page.
    ///
    /// Inserts a `<script>` reference before each closing `</body>` tag,
    /// so deployed pages can warn readers viewing an outdated version.
    /// Returns the number of pages patched.
    pub fn inject_version_warning(html_root: &Path, site_url: &str) -> Result<usize> {
        let tag = format!("    <script src=\"{site_url}/versionwarning.js\"></script>\n</body>");

        let mut patched = 0;
        for page in collect_html_files(html_root)? {
            let content = std::fs::read_to_string(&page)?;
            if !content.contains("</body>") {
                continue;
            }
            std::fs::write(&page, content.replace("</body>", &tag))?;
            patched += 1;
        }
        Ok(patched)
    }
}

/// Collect all `.html` files under a directory recursively.
fn collect_html_files(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();
    collect_html_files_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_html_files_recursive(dir: &Path, files: &mut Vec<std::path::PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_html_files_recursive(&path, files)?;
        } else if path.extension().is_some_and(|e| e == "html") {
            files.push(path);
        }
    }

    Ok(())
}
