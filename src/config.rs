use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub db_url: Option<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            db_url: None,
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    "wp_".to_string()
}

/// How category slugs are resolved for each post.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryLookup {
    /// One join per post, issued while enumerating.
    #[default]
    PerPost,
    /// One join over all relationships, grouped by post before enumerating.
    Prefetch,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ImportConfig {
    #[serde(default)]
    pub category_lookup: CategoryLookup,
    #[serde(default)]
    pub skip_unknown_post_types: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub download_attachments: bool,
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            download_attachments: false,
            overwrite: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Table prefixes are interpolated into identifiers, never bound as parameters.
pub fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty()
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if !is_valid_prefix(&config.source.prefix) {
        anyhow::bail!(
            "source.prefix must be non-empty and contain only ASCII letters, digits and '_' (got '{}')",
            config.source.prefix
        );
    }

    if let Some(url) = &config.source.db_url {
        if url.trim().is_empty() {
            anyhow::bail!("source.db_url must not be empty when set");
        }
    }

    Ok(config)
}

/// Load the config file if one was given, otherwise fall back to defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => load_config(p),
        None => Ok(Config::default()),
    }
}
