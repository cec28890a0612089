use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use stig_recon_core::{OutputFormat, XCCDF_NAMESPACE};

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Layered runtime settings: built-in defaults, then the optional config
/// file, then `STIG_RECON_*` environment variables. CLI flags are applied on
/// top by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub log_filter: String,
    pub format: OutputFormat,
    /// Namespace the manual checklist's `Group`/`Rule` elements live in.
    pub checklist_namespace: String,
    pub output_file: PathBuf,
    pub summary_file: PathBuf,
    pub checklist_file: PathBuf,
}

impl Settings {
    const ENV_PREFIX: &'static str = "STIG_RECON";

    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("log_filter", DEFAULT_LOG_FILTER)?
            .set_default("format", "csv")?
            .set_default("checklist_namespace", XCCDF_NAMESPACE)?
            .set_default("output_file", "output.csv")?
            .set_default("summary_file", "summary.csv")?
            .set_default("checklist_file", "checklist.csv")?;
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let source = config_file
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "defaults and environment".to_string());
        builder
            .add_source(Environment::with_prefix(Self::ENV_PREFIX))
            .build()
            .and_then(Config::try_deserialize)
            .with_context(|| format!("failed to load settings from {source}"))
    }
}
