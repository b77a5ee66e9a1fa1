//! Docwright CI - documentation build orchestration
//!
//! Provides the four stages of the documentation CI pipeline:
//! - Classify: decide skip / quick / full / pattern build from the commit
//! - Provision: install OS packages and the pinned build environment
//! - Build: invoke the documentation generator and capture its log
//! - Report: attribute pages and warnings to a pull request's changes

pub mod build;
pub mod classify;
pub mod pipeline;
pub mod provision;
pub mod report;

// Re-export key types
pub use build::{BuildPlan, DocBuilder, MakeTarget};
pub use classify::{classify, gather_and_classify, BuildKind, ClassifyInput};
pub use pipeline::{DocPipeline, PipelineOptions, PipelineResult};
pub use provision::Provisioner;
pub use report::{AffectedReport, Reporter};
