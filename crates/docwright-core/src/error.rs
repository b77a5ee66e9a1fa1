//! Error taxonomy for the docwright pipeline.

use std::path::PathBuf;

/// Errors produced while orchestrating a documentation CI run.
///
/// Classification-input problems (missing commit id, unreadable message,
/// failed fetch) never appear here: the classifier degrades to a
/// conservative build type instead of failing the job.
#[derive(Debug, thiserror::Error)]
pub enum DocCiError {
    #[error("git error: {0}")]
    Git(String),

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command {name} timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },

    #[error("provisioning step '{stage}' failed with exit code {exit_code}")]
    Provision { stage: String, exit_code: i32 },

    #[error("documentation build failed with exit code {exit_code}, see {log}")]
    Build { exit_code: i32, log: PathBuf },

    #[error("report generation failed: {0}")]
    Report(String),

    #[error("{count} warning(s) in files changed by this pull request, see {report}")]
    WarningsFound { count: usize, report: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocCiError {
    /// Exit code the process should finish with for this error.
    ///
    /// Build failures propagate the generator's own status; everything
    /// else maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            DocCiError::Build { exit_code, .. } if *exit_code > 0 => *exit_code,
            _ => 1,
        }
    }
}

/// Result type for docwright operations.
pub type Result<T> = std::result::Result<T, DocCiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_propagates_exit_code() {
        let err = DocCiError::Build {
            exit_code: 2,
            log: PathBuf::from("doc-build.log"),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("doc-build.log"));
    }

    #[test]
    fn test_warnings_error_exit_code_is_one() {
        let err = DocCiError::WarningsFound {
            count: 3,
            report: PathBuf::from("_changed.html"),
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("3 warning(s)"));
    }

    #[test]
    fn test_provision_error_display() {
        let err = DocCiError::Provision {
            stage: "apt_install".to_string(),
            exit_code: 100,
        };
        assert!(err.to_string().contains("apt_install"));
        assert!(err.to_string().contains("100"));
    }
}
