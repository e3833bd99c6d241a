//! CLI configuration loaded from `markbook.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Output formats accepted by `default_format` and `--format`.
pub const FORMATS: [&str; 4] = ["text", "json", "markdown", "md"];

/// Top-level markbook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkbookConfig {
    /// Where `analyze --save` writes reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Output format when `--format` is not given.
    #[serde(default = "default_format")]
    pub default_format: String,
    /// Class to restrict analysis to when `--class` is not given.
    #[serde(default)]
    pub class_filter: Option<String>,
    /// Percentage points a student must differ from the cohort by for a
    /// question to count as a strength or weakness.
    #[serde(default = "default_threshold")]
    pub comparison_threshold: f64,
    #[serde(default = "default_pretty_json")]
    pub pretty_json: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./markbook-reports")
}
fn default_format() -> String {
    "text".to_string()
}
fn default_threshold() -> f64 {
    10.0
}
fn default_pretty_json() -> bool {
    true
}

impl Default for MarkbookConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            default_format: default_format(),
            class_filter: None,
            comparison_threshold: default_threshold(),
            pretty_json: default_pretty_json(),
        }
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `markbook.toml` in the current directory
/// 2. `~/.config/markbook/config.toml`
///
/// Environment variable overrides: `MARKBOOK_OUTPUT_DIR`, `MARKBOOK_FORMAT`.
pub fn load_config_from(path: Option<&Path>) -> Result<MarkbookConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("markbook.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<MarkbookConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MarkbookConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    check_format(&config.default_format).context("invalid default_format")?;
    if let Some(path) = &config_path {
        tracing::debug!("loaded config from {}", path.display());
    }

    Ok(config)
}

/// Reject output formats other than [`FORMATS`].
pub fn check_format(format: &str) -> Result<()> {
    if !FORMATS.contains(&format) {
        anyhow::bail!("unknown format '{format}' (expected text, json or markdown)");
    }
    Ok(())
}

fn apply_env_overrides(config: &mut MarkbookConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(dir) = lookup("MARKBOOK_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
    }
    if let Some(format) = lookup("MARKBOOK_FORMAT") {
        config.default_format = format;
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("markbook"))
}
