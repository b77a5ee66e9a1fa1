//! Integration tests for the documentation pipeline with ScriptedRunner.
//!
//! Each scenario builds a real throwaway git checkout (an upstream repo plus
//! a clone with an `origin` remote) so classification runs against actual
//! commits and diffs; only the external tools are faked.

use docwright_ci::{BuildKind, DocPipeline, MakeTarget, PipelineOptions};
use docwright_core::fakes::ScriptedRunner;
use docwright_core::{git, CiConfig, DocCiError};
use std::path::Path;
use std::process::Command;

fn run_git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn commit_all(repo_dir: &Path, message: &str) {
    run_git(repo_dir, &["add", "."]);
    run_git(repo_dir, &["commit", "-m", message]);
}

/// Create an upstream repo with one commit on `main`, and a clone of it
/// whose `origin` points back at the upstream.
fn make_cloned_repo() -> (tempfile::TempDir, std::path::PathBuf) {
    let root = tempfile::tempdir().unwrap();
    let upstream = root.path().join("upstream");
    std::fs::create_dir_all(&upstream).unwrap();
    run_git(&upstream, &["init", "-b", "main"]);
    run_git(&upstream, &["config", "user.name", "test-user"]);
    run_git(&upstream, &["config", "user.email", "test@example.com"]);
    std::fs::write(upstream.join("README.md"), "upstream\n").unwrap();
    commit_all(&upstream, "initial");

    let clone = root.path().join("clone");
    run_git(
        root.path(),
        &["clone", upstream.to_str().unwrap(), clone.to_str().unwrap()],
    );
    run_git(&clone, &["config", "user.name", "test-user"]);
    run_git(&clone, &["config", "user.email", "test@example.com"]);

    (root, clone)
}

fn config_for(clone: &Path, vars: &[(&str, &str)]) -> CiConfig {
    let mut all: Vec<(String, String)> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let sha = git::capture_head_sha(clone).unwrap();
    all.push(("CI_COMMIT_SHA".to_string(), sha));
    CiConfig::from_vars(all).with_repo_root(clone)
}

/// Scenario: `[doc skip]` commit exits cleanly without touching any tool.
#[tokio::test]
async fn test_doc_skip_runs_nothing() {
    let (_root, clone) = make_cloned_repo();
    run_git(&clone, &["commit", "--allow-empty", "-m", "fix typo [doc skip]"]);
    let config = config_for(&clone, &[("CI_PULL_REQUEST", "https://example.org/pr/1")]);

    let runner = ScriptedRunner::new();
    let result = DocPipeline::run(&runner, &config, &PipelineOptions::default())
        .await
        .expect("pipeline failed");

    assert!(result.decision.to_string().starts_with("SKIP"));
    assert!(!result.built);
    assert!(result.report_path.is_none());
    assert!(
        runner.calls().is_empty(),
        "no provisioning or build commands may run on skip"
    );
}

/// Scenario: a PR touching only an example script triggers a pattern build.
#[tokio::test]
async fn test_pr_changing_example_builds_with_pattern() {
    let (_root, clone) = make_cloned_repo();
    run_git(&clone, &["checkout", "-b", "add-example"]);
    std::fs::create_dir_all(clone.join("examples")).unwrap();
    std::fs::write(clone.join("examples/plot_foo.py"), "print('foo')\n").unwrap();
    commit_all(&clone, "add plotting example");

    let config = config_for(&clone, &[("CI_PULL_REQUEST", "https://example.org/pr/2")]);
    let runner = ScriptedRunner::new();
    runner.succeed_with("doc_build", "build succeeded\n");

    let result = DocPipeline::run(&runner, &config, &PipelineOptions::default())
        .await
        .expect("pipeline failed");

    let rendered = result.decision.to_string();
    assert!(
        rendered.starts_with("BUILD: detected examples"),
        "unexpected decision: {rendered}"
    );
    assert!(result.decision.pattern().unwrap().contains("plot_foo\\.py"));
    assert!(result.built);

    // Stages ran in order, and the build saw the restriction pattern.
    let calls = runner.calls();
    assert_eq!(calls[0].name, "apt_install");
    assert_eq!(calls[1].name, "env_create");
    assert_eq!(calls[2].name, "doc_build");
    assert!(calls[2]
        .envs
        .iter()
        .any(|(k, v)| k == "EXAMPLES_PATTERN" && v.contains("plot_foo")));

    // The PR report lists the example's gallery page.
    let report = std::fs::read_to_string(result.report_path.unwrap()).unwrap();
    assert!(report.contains("auto_examples/plot_foo.html"));
}

/// Scenario: a branch build on main packages the site regardless of verdict.
#[tokio::test]
async fn test_branch_build_on_main_selects_dist() {
    let (_root, clone) = make_cloned_repo();
    run_git(&clone, &["commit", "--allow-empty", "-m", "routine merge"]);
    let config = config_for(&clone, &[("CI_BRANCH", "main")]);

    let runner = ScriptedRunner::new();
    let result = DocPipeline::run(
        &runner,
        &config,
        &PipelineOptions { provision: false },
    )
    .await
    .expect("pipeline failed");

    assert!(matches!(result.decision, BuildKind::Full { .. }));
    let build_calls = runner.calls_named("doc_build");
    assert_eq!(build_calls.len(), 1);
    assert_eq!(build_calls[0].args, vec![MakeTarget::Dist.as_str().to_string()]);
}

/// Scenario: warnings in changed files fail the run after the report is
/// written.
#[tokio::test]
async fn test_warnings_in_changed_files_fail_the_run() {
    let (_root, clone) = make_cloned_repo();
    run_git(&clone, &["checkout", "-b", "doc-tweak"]);
    std::fs::create_dir_all(clone.join("doc")).unwrap();
    std::fs::write(clone.join("doc/install.rst"), "Install\n=======\n").unwrap();
    commit_all(&clone, "tweak install docs");

    let config = config_for(&clone, &[("CI_PULL_REQUEST", "https://example.org/pr/3")]);
    let runner = ScriptedRunner::new();
    runner.succeed_with(
        "doc_build",
        "doc/install.rst:2: WARNING: title underline too short\n",
    );

    let err = DocPipeline::run(&runner, &config, &PipelineOptions { provision: false })
        .await
        .unwrap_err();

    let DocCiError::WarningsFound { count, report } = err else {
        panic!("expected WarningsFound, got {err}");
    };
    assert_eq!(count, 1);
    let html = std::fs::read_to_string(report).unwrap();
    assert!(html.contains("title underline too short"));
    assert!(html.contains("install.html"));
}

/// Scenario: a PR with no doc-related changes gets a quick build.
#[tokio::test]
async fn test_pr_with_unrelated_change_is_quick() {
    let (_root, clone) = make_cloned_repo();
    run_git(&clone, &["checkout", "-b", "ci-tweak"]);
    std::fs::write(clone.join("README.md"), "upstream, clarified\n").unwrap();
    commit_all(&clone, "clarify readme");

    let config = config_for(&clone, &[("CI_PULL_REQUEST", "https://example.org/pr/4")]);
    let runner = ScriptedRunner::new();

    let result = DocPipeline::run(&runner, &config, &PipelineOptions { provision: false })
        .await
        .expect("pipeline failed");

    assert!(matches!(result.decision, BuildKind::Quick { .. }));
    let build_calls = runner.calls_named("doc_build");
    assert_eq!(
        build_calls[0].args,
        vec![MakeTarget::HtmlNoPlot.as_str().to_string()]
    );
}

/// Scenario: changed rst files pull the examples they reference into the
/// restriction pattern.
#[tokio::test]
async fn test_rst_image_references_recover_example_scripts() {
    let (_root, clone) = make_cloned_repo();
    run_git(&clone, &["checkout", "-b", "doc-images"]);
    std::fs::create_dir_all(clone.join("doc/modules")).unwrap();
    std::fs::write(
        clone.join("doc/modules/calibration.rst"),
        "Calibration\n===========\n\n\
         .. image:: ../auto_examples/images/sphx_glr_plot_calibration_001.png\n",
    )
    .unwrap();
    commit_all(&clone, "illustrate calibration");

    let config = config_for(&clone, &[("CI_PULL_REQUEST", "https://example.org/pr/5")]);
    let runner = ScriptedRunner::new();

    let result = DocPipeline::run(&runner, &config, &PipelineOptions { provision: false })
        .await
        .expect("pipeline failed");

    assert!(result
        .decision
        .pattern()
        .unwrap()
        .contains("plot_calibration\\.py"));
}
