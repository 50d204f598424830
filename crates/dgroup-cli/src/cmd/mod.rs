pub mod apply;
pub mod config;
pub mod destroy;
pub mod plan;
pub mod show;
pub mod validate;

use anyhow::Context as _;
use dgroup_core::config::{ReconcileConfig, WarnLevel};
use dgroup_core::source::GroupSpec;
use dgroup_core::types::DeploymentGroup;
use std::path::{Path, PathBuf};

/// Global flags shared by every subcommand.
pub struct Context {
    pub store: PathBuf,
    pub config: Option<PathBuf>,
    pub json: bool,
}

impl Context {
    /// Load reconciler settings and refuse to run on settings with errors.
    pub fn load_config(&self) -> anyhow::Result<ReconcileConfig> {
        let cfg = ReconcileConfig::load_or_default(self.config.as_deref()).with_context(|| {
            format!(
                "failed to load settings from {}",
                self.config
                    .as_deref()
                    .unwrap_or(Path::new("<default>"))
                    .display()
            )
        })?;
        let errors: Vec<String> = cfg
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if !errors.is_empty() {
            anyhow::bail!("invalid settings: {}", errors.join("; "));
        }
        Ok(cfg)
    }

    pub fn runtime(&self) -> anyhow::Result<tokio::runtime::Runtime> {
        tokio::runtime::Runtime::new().context("failed to start async runtime")
    }
}

/// Parse a group file and build the validated desired state.
pub fn load_desired(file: &Path, cfg: &ReconcileConfig) -> anyhow::Result<DeploymentGroup> {
    let spec =
        GroupSpec::load(file).with_context(|| format!("failed to read {}", file.display()))?;
    let group = spec
        .to_desired(&cfg.validation)
        .with_context(|| format!("{} is not a valid deployment group", file.display()))?;
    Ok(group)
}
