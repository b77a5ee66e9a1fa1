//! Build-type classification.
//!
//! Decides how much of the documentation to build for a commit: nothing,
//! a quick build without example execution, a full build, or a full build
//! restricted to the example scripts a pull request actually touches.
//!
//! Explicit commit-message markers always win over file-diff heuristics,
//! and skip beats quick beats build. Anything that prevents inspecting the
//! commit degrades to a quick build instead of failing the job.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use docwright_core::{git, CiConfig};
use tracing::{debug, warn};

/// Marker that skips the documentation build entirely.
pub const SKIP_MARKER: &str = "[doc skip]";

/// Marker that forces a quick (no example execution) build.
pub const QUICK_MARKER: &str = "[doc quick]";

/// Marker that forces a full build.
pub const BUILD_MARKER: &str = "[doc build]";

/// Image references generated by the gallery builder, e.g.
/// `sphx_glr_plot_calibration_001.png` or `sphx_glr_plot_calibration_thumb.png`.
fn image_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"sphx_glr_(\w+)_(?:\d{3}|thumb)\.png").expect("image ref pattern is valid")
    })
}

/// The classifier's verdict for one commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildKind {
    /// Do not build at all; the job exits 0 immediately.
    Skip { reason: String },

    /// Build without executing plot-generating examples.
    Quick { reason: String },

    /// Full build, all examples.
    Full { reason: String },

    /// Full build restricted to the examples named by `pattern`.
    FullPattern { reason: String, pattern: String },
}

impl BuildKind {
    pub fn is_skip(&self) -> bool {
        matches!(self, BuildKind::Skip { .. })
    }

    /// The restriction pattern, for pattern builds.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            BuildKind::FullPattern { pattern, .. } => Some(pattern),
            _ => None,
        }
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildKind::Skip { reason } => write!(f, "SKIP: {reason}"),
            BuildKind::Quick { reason } => write!(f, "QUICK: {reason}"),
            BuildKind::Full { reason } => write!(f, "BUILD: {reason}"),
            BuildKind::FullPattern { reason, pattern } => {
                write!(f, "BUILD: detected examples {reason}: {pattern}")
            }
        }
    }
}

/// Snapshot of everything the classifier consults.
///
/// Built by [`gather_and_classify`] from git and the worktree; constructed
/// directly in tests.
#[derive(Debug, Clone)]
pub struct ClassifyInput {
    /// Commit under build, if the platform provided one.
    pub commit_sha: Option<String>,

    /// Commit message; `None` when the commit could not be inspected.
    pub commit_message: Option<String>,

    /// Whether the job belongs to a pull request.
    pub is_pull_request: bool,

    /// Changed files against the reference branch; `None` when the diff
    /// could not be computed.
    pub changed_files: Option<Vec<String>>,

    /// Example scripts referenced by changed `.rst` files (basenames).
    pub referenced_examples: BTreeSet<String>,

    /// Diff range, used in human-readable reasons.
    pub diff_range: String,

    /// Documentation directory name.
    pub doc_dir: String,

    /// Examples directory name.
    pub examples_dir: String,
}

impl Default for ClassifyInput {
    fn default() -> Self {
        Self {
            commit_sha: None,
            commit_message: None,
            is_pull_request: false,
            changed_files: None,
            referenced_examples: BTreeSet::new(),
            diff_range: "origin/main...HEAD".to_string(),
            doc_dir: "doc".to_string(),
            examples_dir: "examples".to_string(),
        }
    }
}

/// Classify a commit. Pure over its input snapshot.
pub fn classify(input: &ClassifyInput) -> BuildKind {
    if input.commit_sha.is_none() {
        return BuildKind::Skip {
            reason: "no commit id provided".to_string(),
        };
    }

    let message = match &input.commit_message {
        Some(m) => m,
        None => {
            return BuildKind::Quick {
                reason: "failed to inspect the commit message".to_string(),
            }
        }
    };

    if message.contains(SKIP_MARKER) {
        return BuildKind::Skip {
            reason: format!("{SKIP_MARKER} marker found"),
        };
    }
    if message.contains(QUICK_MARKER) {
        return BuildKind::Quick {
            reason: format!("{QUICK_MARKER} marker found"),
        };
    }
    if message.contains(BUILD_MARKER) {
        return BuildKind::Full {
            reason: format!("{BUILD_MARKER} marker found"),
        };
    }

    if !input.is_pull_request {
        return BuildKind::Full {
            reason: "not a pull request".to_string(),
        };
    }

    let files = match &input.changed_files {
        Some(f) => f,
        None => {
            return BuildKind::Quick {
                reason: format!("failed to get changed filenames for {}", input.diff_range),
            }
        }
    };
    if files.is_empty() {
        return BuildKind::Quick {
            reason: format!("no changed filenames for {}", input.diff_range),
        };
    }

    let mut scripts: BTreeSet<String> = input.referenced_examples.clone();
    scripts.extend(
        files
            .iter()
            .filter(|f| is_example_script(f, &input.examples_dir))
            .filter_map(|f| basename(f).map(String::from)),
    );

    if !scripts.is_empty() {
        return BuildKind::FullPattern {
            reason: format!("modified in {}", input.diff_range),
            pattern: example_pattern(&scripts),
        };
    }

    let doc_prefix = format!("{}/", input.doc_dir);
    let examples_prefix = format!("{}/", input.examples_dir);
    if files
        .iter()
        .any(|f| f.starts_with(&doc_prefix) || f.starts_with(&examples_prefix))
    {
        BuildKind::Full {
            reason: format!(
                "{} or {} files modified in {}",
                doc_prefix, examples_prefix, input.diff_range
            ),
        }
    } else {
        BuildKind::Quick {
            reason: format!(
                "no {} or {} files modified in {}",
                doc_prefix, examples_prefix, input.diff_range
            ),
        }
    }
}

/// Extract the example scripts whose generated images an `.rst` source
/// references, as `<stem>.py` basenames.
pub fn extract_example_refs(rst_text: &str) -> BTreeSet<String> {
    image_ref_regex()
        .captures_iter(rst_text)
        .map(|caps| format!("{}.py", &caps[1]))
        .collect()
}

/// Render a set of script basenames as the generator's restriction pattern.
fn example_pattern(scripts: &BTreeSet<String>) -> String {
    scripts
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|")
}

/// A changed path that is a plot-generating example script.
fn is_example_script(path: &str, examples_dir: &str) -> bool {
    let Some(rest) = path.strip_prefix(&format!("{examples_dir}/")) else {
        return false;
    };
    match rest.rsplit('/').next() {
        Some(name) => name.starts_with("plot_") && name.ends_with(".py"),
        None => false,
    }
}

fn basename(path: &str) -> Option<&str> {
    path.rsplit('/').next()
}

/// Gather classification inputs from git and the worktree, then classify.
///
/// Inspection failures are downgraded inside the snapshot (`None` fields)
/// so the classifier can pick its conservative default.
pub fn gather_and_classify(config: &CiConfig) -> BuildKind {
    let mut input = ClassifyInput {
        commit_sha: config.commit_sha.clone(),
        is_pull_request: config.is_pull_request(),
        doc_dir: config.doc_dir.to_string_lossy().into_owned(),
        examples_dir: config.examples_dir.to_string_lossy().into_owned(),
        ..ClassifyInput::default()
    };

    let Some(sha) = config.commit_sha.clone() else {
        return classify(&input);
    };
    input.diff_range = config.git_range(&sha);

    match git::commit_message(&config.repo_root, &sha) {
        Ok(message) => input.commit_message = Some(message),
        Err(e) => {
            warn!(sha = %sha, error = %e, "could not read commit message");
            return classify(&input);
        }
    }

    // Only pull requests need the diff; markers and branch builds are
    // already decidable.
    if input.is_pull_request {
        if let Err(e) = git::fetch_branch(
            &config.repo_root,
            &config.upstream_remote,
            &config.default_branch,
        ) {
            warn!(error = %e, "fetch of reference branch failed");
        }
        match git::changed_files(&config.repo_root, &input.diff_range) {
            Ok(files) => {
                input.referenced_examples = referenced_examples_in_worktree(
                    &config.repo_root,
                    &files,
                    &input.doc_dir,
                );
                input.changed_files = Some(files);
            }
            Err(e) => {
                warn!(range = %input.diff_range, error = %e, "diff failed");
            }
        }
    }

    classify(&input)
}

/// Read each changed `.rst` file under the doc tree and collect the example
/// scripts its generated-image references point back to.
fn referenced_examples_in_worktree(
    repo_root: &Path,
    changed_files: &[String],
    doc_dir: &str,
) -> BTreeSet<String> {
    let doc_prefix = format!("{doc_dir}/");
    let mut refs = BTreeSet::new();
    for file in changed_files {
        if !file.starts_with(&doc_prefix) || !file.ends_with(".rst") {
            continue;
        }
        match std::fs::read_to_string(repo_root.join(file)) {
            Ok(text) => refs.extend(extract_example_refs(&text)),
            // Deleted rst files still show up in the diff.
            Err(e) => debug!(file = %file, error = %e, "skipping unreadable rst"),
        }
    }
    refs
}
