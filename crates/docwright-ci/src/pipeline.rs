//! Pipeline orchestration.
//!
//! Runs the stages in fixed order: classify, provision, build, patch,
//! report. There is no retry and no state between stages beyond the build
//! log on disk; each run is identified by a generated run id carried on the
//! tracing span.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;

use docwright_core::{git, CiConfig, DocCiError, Result, ToolRunner};

use crate::build::{BuildPlan, DocBuilder};
use crate::classify::{gather_and_classify, BuildKind};
use crate::provision::Provisioner;
use crate::report::Reporter;

/// Knobs for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Provision the environment before building. Disabled when the CI
    /// image is already prepared.
    pub provision: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { provision: true }
    }
}

/// Outcome of a completed (non-failed) pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Correlation id for this run's log lines.
    pub run_id: String,

    /// The classifier's verdict.
    pub decision: BuildKind,

    /// Whether a documentation build actually ran.
    pub built: bool,

    /// Pages patched with the version-warning script.
    pub pages_patched: usize,

    /// Path of the changed-files report, pull requests only.
    pub report_path: Option<PathBuf>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

/// The documentation CI pipeline.
pub struct DocPipeline;

impl DocPipeline {
    /// Execute the pipeline for the configured commit.
    ///
    /// Failure modes, in stage order: provisioning and build errors abort
    /// with the underlying exit status; warnings attributed to a pull
    /// request's changed files fail the run *after* the build and the
    /// report artifact are complete.
    pub async fn run(
        runner: &dyn ToolRunner,
        config: &CiConfig,
        options: &PipelineOptions,
    ) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("docwright.run", run_id = %run_id);
        Self::run_stages(runner, config, options, run_id)
            .instrument(span)
            .await
    }

    async fn run_stages(
        runner: &dyn ToolRunner,
        config: &CiConfig,
        options: &PipelineOptions,
        run_id: String,
    ) -> Result<PipelineResult> {
        let start = Instant::now();

        let decision = gather_and_classify(config);
        info!(decision = %decision, "build type decided");

        let Some(plan) = BuildPlan::from_kind(&decision, config) else {
            info!("nothing to build");
            return Ok(PipelineResult {
                run_id,
                decision,
                built: false,
                pages_patched: 0,
                report_path: None,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        };

        if options.provision {
            Provisioner::provision(runner, config).await?;
        }

        DocBuilder::build(runner, config, &plan).await?;
        let pages_patched =
            DocBuilder::inject_version_warning(&config.html_root(), &config.site_url)?;

        let mut report_path = None;
        if config.is_pull_request() {
            if let Some(sha) = &config.commit_sha {
                let changed = git::changed_files(&config.repo_root, &config.git_range(sha))
                    .unwrap_or_default();
                let log = std::fs::read_to_string(config.build_log()).unwrap_or_default();
                let report = Reporter::generate(config, &changed, &log);
                let path = Reporter::write(&report, config)?;
                report_path = Some(path.clone());

                if report.has_warnings() {
                    return Err(DocCiError::WarningsFound {
                        count: report.warnings.len(),
                        report: path,
                    });
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(duration_ms, "documentation pipeline finished");

        Ok(PipelineResult {
            run_id,
            decision,
            built: true,
            pages_patched,
            report_path,
            duration_ms,
        })
    }
}
