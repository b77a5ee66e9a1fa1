//! Pull-request reporting.
//!
//! Maps a PR's changed files to the documentation pages they plausibly
//! affect, pulls the warnings attributable to those files out of the build
//! log, and renders the `_changed.html` summary artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

use docwright_core::{CiConfig, DocCiError, Result};

/// Pages and warnings attributed to one pull request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AffectedReport {
    /// Generated page paths, relative to the site root.
    pub pages: Vec<String>,

    /// Build-log warning lines that mention a changed file.
    pub warnings: Vec<String>,

    pub generated_at: DateTime<Utc>,
}

impl AffectedReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Builds the changed-files report for a pull request.
pub struct Reporter;

impl Reporter {
    /// Compute the generated pages plausibly affected by the changed files.
    ///
    /// - `doc/**/*.rst` maps to its rendered page
    /// - `examples/**/*.py` maps to its gallery page
    /// - source-tree files are attributed by scanning the generated
    ///   API-reference pages for textual references to them
    pub fn affected_doc_paths(changed: &[String], config: &CiConfig) -> Vec<String> {
        let doc_dir = config.doc_dir.to_string_lossy();
        let examples_dir = config.examples_dir.to_string_lossy();
        let source_dir = config.source_dir.to_string_lossy();

        let mut seen = BTreeSet::new();
        let mut pages = Vec::new();
        let mut push = |page: String, pages: &mut Vec<String>| {
            if seen.insert(page.clone()) {
                pages.push(page);
            }
        };

        for file in changed {
            if let Some(page) = rst_page(file, &doc_dir) {
                push(page, &mut pages);
            } else if let Some(page) = example_page(file, &examples_dir) {
                push(page, &mut pages);
            }
        }

        let source_prefix = format!("{source_dir}/");
        let source_files: Vec<&String> = changed
            .iter()
            .filter(|f| f.starts_with(&source_prefix))
            .collect();
        if !source_files.is_empty() {
            for page in api_pages_referencing(&config.generated_api_dir(), &source_files) {
                push(page, &mut pages);
            }
        }

        pages
    }

    /// Pull the warning lines attributable to the changed files out of the
    /// captured build log. Order-stable, deduplicated.
    pub fn scan_warnings(log: &str, changed: &[String]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        log.lines()
            .filter(|line| line.contains("WARNING"))
            .filter(|line| changed.iter().any(|file| line.contains(file.as_str())))
            .map(str::trim)
            .filter(|line| seen.insert(line.to_string()))
            .map(String::from)
            .collect()
    }

    /// Build the report for a changed-file set and a captured build log.
    pub fn generate(config: &CiConfig, changed: &[String], log: &str) -> AffectedReport {
        let report = AffectedReport {
            pages: Self::affected_doc_paths(changed, config),
            warnings: Self::scan_warnings(log, changed),
            generated_at: Utc::now(),
        };
        info!(
            pages = report.pages.len(),
            warnings = report.warnings.len(),
            "changed-files report computed"
        );
        report
    }

    /// Render the report as the `_changed.html` summary page.
    pub fn render_html(report: &AffectedReport, config: &CiConfig) -> String {
        let mut html = String::from("<html>\n<head><title>Changed documentation</title></head>\n<body>\n");
        html.push_str("<h1>Documentation affected by this pull request</h1>\n");
        html.push_str(&format!(
            "<p>Generated {}</p>\n",
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));

        if report.pages.is_empty() {
            html.push_str("<p>No documentation pages were mapped to the changed files.</p>\n");
        } else {
            html.push_str("<ul>\n");
            for page in &report.pages {
                html.push_str(&format!(
                    "<li><a href=\"{site}/dev/{page}\">{page}</a> \
                     [<a href=\"{site}/stable/{page}\">stable</a>]</li>\n",
                    site = config.site_url,
                    page = escape_html(page),
                ));
            }
            html.push_str("</ul>\n");
        }

        if report.has_warnings() {
            html.push_str("<h2>Warnings in changed files</h2>\n<ul>\n");
            for warning in &report.warnings {
                html.push_str(&format!("<li><pre>{}</pre></li>\n", escape_html(warning)));
            }
            html.push_str("</ul>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    /// Write the rendered report under the HTML root. Returns its path.
    pub fn write(report: &AffectedReport, config: &CiConfig) -> Result<PathBuf> {
        let html_root = config.html_root();
        std::fs::create_dir_all(&html_root)
            .map_err(|e| DocCiError::Report(format!("cannot create {}: {e}", html_root.display())))?;

        let path = html_root.join("_changed.html");
        std::fs::write(&path, Self::render_html(report, config))?;
        info!(report = %path.display(), "changed-files report written");
        Ok(path)
    }
}

/// `doc/foo/bar.rst` -> `foo/bar.html`
fn rst_page(path: &str, doc_dir: &str) -> Option<String> {
    let rest = path.strip_prefix(&format!("{doc_dir}/"))?;
    let stem = rest.strip_suffix(".rst")?;
    Some(format!("{stem}.html"))
}

/// `examples/foo/plot_bar.py` -> `auto_examples/foo/plot_bar.html`
fn example_page(path: &str, examples_dir: &str) -> Option<String> {
    let rest = path.strip_prefix(&format!("{examples_dir}/"))?;
    let stem = rest.strip_suffix(".py")?;
    Some(format!("auto_{examples_dir}/{stem}.html"))
}

/// Scan generated API-reference pages for references to changed source
/// files, returning matching page paths relative to the site root.
fn api_pages_referencing(api_dir: &Path, source_files: &[&String]) -> Vec<String> {
    let mut pages = Vec::new();
    let entries = match std::fs::read_dir(api_dir) {
        Ok(entries) => entries,
        // The quick build may not generate API pages at all.
        Err(_) => return pages,
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "html"))
        .collect();
    paths.sort();

    for path in paths {
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        if source_files.iter().any(|f| content.contains(f.as_str())) {
            if let Some(name) = path.file_name() {
                pages.push(format!("modules/generated/{}", name.to_string_lossy()));
            }
        }
    }
    pages
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
