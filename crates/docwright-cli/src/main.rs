//! Docwright - documentation CI orchestrator
//!
//! The `docwright` command decides whether and how to build the docs for
//! the current commit, provisions the build environment, runs the
//! generator, and reports PR-affected pages and warnings.
//!
//! ## Commands
//!
//! - `run`: execute the full pipeline (classify, provision, build, report)
//! - `classify`: print the build-type decision for the current commit
//! - `provision`: install OS packages and create the build environment
//! - `report`: regenerate the changed-files report from an existing log

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};

use docwright_ci::{gather_and_classify, DocPipeline, PipelineOptions, Provisioner, Reporter};
use docwright_core::{git, init_tracing, CiConfig, DocCiError, ProcessRunner};

#[derive(Parser)]
#[command(name = "docwright")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Documentation CI orchestrator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Repository checkout root
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full documentation pipeline for the current commit
    Run {
        /// Skip OS package and environment provisioning
        #[arg(long)]
        no_provision: bool,

        /// Print the pipeline result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the build-type decision without building anything
    Classify {
        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },

    /// Install OS packages and create the pinned build environment
    Provision,

    /// Regenerate the changed-files report from an existing build log
    Report {
        /// Build log to scan for warnings (default: the pipeline's log path)
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json_logs, level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        let code = e
            .downcast_ref::<DocCiError>()
            .map(DocCiError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = CiConfig::from_env().with_repo_root(&cli.workspace);

    match cli.command {
        Commands::Run { no_provision, json } => cmd_run(&config, no_provision, json).await,
        Commands::Classify { json } => cmd_classify(&config, json),
        Commands::Provision => cmd_provision(&config).await,
        Commands::Report { log_file } => cmd_report(&config, log_file.as_deref()),
    }
}

/// Execute the full pipeline and print its outcome.
async fn cmd_run(config: &CiConfig, no_provision: bool, json: bool) -> Result<()> {
    let options = PipelineOptions {
        provision: !no_provision,
    };
    let result = DocPipeline::run(&ProcessRunner, config, &options)
        .await
        .context("documentation pipeline failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", result.decision);
    if result.built {
        println!("Documentation built in {} ms", result.duration_ms);
        if let Some(report) = &result.report_path {
            println!("Changed-files report: {}", report.display());
        }
    } else {
        println!("Documentation build skipped");
    }
    Ok(())
}

/// Print the classifier's verdict for the configured commit.
fn cmd_classify(config: &CiConfig, json: bool) -> Result<()> {
    let decision = gather_and_classify(config);
    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        println!("{decision}");
    }
    Ok(())
}

/// Provision the build environment only.
async fn cmd_provision(config: &CiConfig) -> Result<()> {
    Provisioner::provision(&ProcessRunner, config)
        .await
        .context("provisioning failed")?;
    println!("Build environment '{}' ready", config.env_name);
    Ok(())
}

/// Rebuild the changed-files report from an existing build log.
///
/// Useful for inspecting warning attribution locally without re-running
/// the generator. Applies the same warning gate as `run`.
fn cmd_report(config: &CiConfig, log_file: Option<&std::path::Path>) -> Result<()> {
    let sha = config
        .commit_sha
        .clone()
        .or_else(|| git::capture_head_sha(&config.repo_root).ok())
        .context("no commit to report on: set CI_COMMIT_SHA or run inside a checkout")?;

    let changed = git::changed_files(&config.repo_root, &config.git_range(&sha))
        .context("failed to list changed files")?;

    let log_path = log_file
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| config.build_log());
    let log = std::fs::read_to_string(&log_path)
        .with_context(|| format!("failed to read build log {}", log_path.display()))?;

    let report = Reporter::generate(config, &changed, &log);
    let path = Reporter::write(&report, config)?;
    info!(report = %path.display(), "report regenerated");
    println!("Changed-files report: {}", path.display());

    if report.has_warnings() {
        return Err(DocCiError::WarningsFound {
            count: report.warnings.len(),
            report: path,
        }
        .into());
    }
    Ok(())
}
