//! Build environment provisioning.
//!
//! Installs the OS packages the generator needs for math rendering and
//! image optimization, then creates an isolated runtime environment with a
//! pinned package set. Any failure here is fatal to the run.

use sha2::{Digest, Sha256};
use tracing::info;

use docwright_core::{CiConfig, CmdSpec, DocCiError, Result, ToolRunner};

/// OS packages for LaTeX math rendering and PNG optimization.
const APT_PACKAGES: &[&str] = &[
    "dvipng",
    "texlive-latex-base",
    "texlive-latex-extra",
    "optipng",
];

/// Logical packages installed into the isolated environment. Pins come from
/// `<PKG>_VERSION` overrides captured in the configuration.
const ENV_PACKAGES: &[&str] = &[
    "python",
    "numpy",
    "scipy",
    "matplotlib",
    "pillow",
    "scikit-image",
    "sphinx",
    "sphinx-gallery",
    "numpydoc",
    "pytest",
];

const APT_TIMEOUT_SECS: u64 = 1200;
const ENV_TIMEOUT_SECS: u64 = 1800;

/// Provisions the documentation build environment.
pub struct Provisioner;

impl Provisioner {
    /// Map a logical package name and optional override to a constraint.
    ///
    /// - override `none` drops the package entirely
    /// - an override starting with a digit pins it exactly
    /// - anything else installs the package unpinned
    pub fn resolve_pin(package: &str, version_override: Option<&str>) -> Option<String> {
        match version_override {
            Some("none") => None,
            Some(v) if v.starts_with(|c: char| c.is_ascii_digit()) => {
                Some(format!("{package}=={v}"))
            }
            _ => Some(package.to_string()),
        }
    }

    /// The full resolved package list for this run.
    pub fn resolved_packages(config: &CiConfig) -> Vec<String> {
        ENV_PACKAGES
            .iter()
            .filter_map(|p| Self::resolve_pin(p, config.pin_override(p)))
            .collect()
    }

    /// Deterministic fingerprint of an ordered pin list.
    pub fn environment_digest(pins: &[String]) -> String {
        let mut hasher = Sha256::new();
        for pin in pins {
            hasher.update(pin.as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }

    /// Install OS packages and create the isolated environment.
    pub async fn provision(runner: &dyn ToolRunner, config: &CiConfig) -> Result<()> {
        let mut apt_args = vec!["apt-get", "install", "-yq"];
        apt_args.extend_from_slice(APT_PACKAGES);
        let apt = CmdSpec::new("apt_install", "sudo", &apt_args).timeout(APT_TIMEOUT_SECS);
        Self::run_fatal(runner, apt).await?;

        let pins = Self::resolved_packages(config);
        let digest = Self::environment_digest(&pins);
        info!(
            env = %config.env_name,
            digest = %&digest[..12],
            packages = pins.len(),
            "creating build environment"
        );

        let mut create = CmdSpec::new(
            "env_create",
            "micromamba",
            &["create", "-n", &config.env_name, "-c", "conda-forge", "-yq"],
        )
        .timeout(ENV_TIMEOUT_SECS);
        create.args.extend(pins);
        Self::run_fatal(runner, create).await?;

        Ok(())
    }

    async fn run_fatal(runner: &dyn ToolRunner, spec: CmdSpec) -> Result<()> {
        info!(stage = %spec.name, program = %spec.program, "provisioning");
        let output = runner.run(&spec).await?;
        if !output.success {
            return Err(DocCiError::Provision {
                stage: spec.name,
                exit_code: output.exit_code,
            });
        }
        Ok(())
    }
}
