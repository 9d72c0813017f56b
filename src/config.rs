//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.salesroll.toml` files.

use crate::analysis::{LinkageRule, RollupOptions};
use crate::models::is_reserved_field;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".salesroll.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Rollup settings.
    #[serde(default)]
    pub rollup: RollupConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "salesroll_report.md".to_string()
}

/// Where officer rows and targets come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Backend base URL, e.g. `https://pos.example.com`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Local JSON export of the user report. Takes precedence over the backend.
    #[serde(default)]
    pub leaves_path: Option<PathBuf>,

    /// Local JSON export of the targets. Takes precedence over the backend.
    #[serde(default)]
    pub targets_path: Option<PathBuf>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Bearer token for the backend.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            leaves_path: None,
            targets_path: None,
            timeout_seconds: default_timeout(),
            token: None,
        }
    }
}

fn default_timeout() -> u64 {
    60
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollupConfig {
    /// Metric columns summed at every tier.
    #[serde(default = "default_metric_fields")]
    pub metric_fields: Vec<String>,

    /// Metric compared against target for achievement.
    #[serde(default = "default_achievement_metric")]
    pub achievement_metric: String,

    /// How managers are attached to their superiors.
    #[serde(default)]
    pub linkage: LinkageRule,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            metric_fields: default_metric_fields(),
            achievement_metric: default_achievement_metric(),
            linkage: LinkageRule::default(),
        }
    }
}

fn default_metric_fields() -> Vec<String> {
    RollupOptions::default().metric_fields
}

fn default_achievement_metric() -> String {
    RollupOptions::default().achievement_metric
}

impl RollupConfig {
    /// Options for the aggregator. The achievement metric is always rolled up.
    pub fn options(&self) -> Result<RollupOptions> {
        for field in self.metric_fields.iter().chain([&self.achievement_metric]) {
            if field.trim().is_empty() {
                bail!("Metric names in [rollup] must not be empty");
            }
            if is_reserved_field(field) {
                bail!("Metric name '{}' in [rollup] clashes with a record field", field);
            }
        }

        let mut metric_fields = self.metric_fields.clone();
        if !metric_fields.contains(&self.achievement_metric) {
            metric_fields.push(self.achievement_metric.clone());
        }

        Ok(RollupOptions {
            metric_fields,
            achievement_metric: self.achievement_metric.clone(),
            linkage: self.linkage,
        })
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Decimal places for amounts and percentages.
    #[serde(default = "default_decimals")]
    pub decimals: usize,

    /// Show each manager's team member ids in Markdown reports.
    #[serde(default)]
    pub include_team_ids: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
            include_team_ids: false,
        }
    }
}

fn default_decimals() -> usize {
    2
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.salesroll.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        // Source settings
        if let Some(ref path) = args.leaves {
            self.source.leaves_path = Some(path.clone());
        }
        if let Some(ref path) = args.targets {
            self.source.targets_path = Some(path.clone());
        }
        if let Some(ref url) = args.base_url {
            self.source.base_url = Some(url.clone());
        }
        if let Some(ref token) = args.token {
            self.source.token = Some(token.clone());
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        // Rollup settings
        if let Some(ref metrics) = args.metrics {
            self.rollup.metric_fields = metrics.clone();
        }
        if let Some(ref metric) = args.achievement_metric {
            self.rollup.achievement_metric = metric.clone();
        }
        if let Some(linkage) = args.linkage {
            self.rollup.linkage = linkage.into();
        }

        if let Some(decimals) = args.decimals {
            self.report.decimals = decimals;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, LinkageArg};
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "salesroll_report.md");
        assert_eq!(config.source.timeout_seconds, 60);
        assert_eq!(config.rollup.achievement_metric, "secondaryValue");
        assert!(config.rollup.metric_fields.contains(&"primaryValue".to_string()));
        assert_eq!(config.rollup.linkage, LinkageRule::SharedLeaves);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "belts.json"
verbose = true

[source]
base_url = "https://pos.example.com"
timeout_seconds = 15

[rollup]
metric_fields = ["primaryValue", "collectionAmount"]
achievement_metric = "collectionAmount"
linkage = "zone-containment"

[report]
decimals = 0
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "belts.json");
        assert!(config.general.verbose);
        assert_eq!(config.source.base_url.as_deref(), Some("https://pos.example.com"));
        assert_eq!(config.source.timeout_seconds, 15);
        assert_eq!(config.rollup.metric_fields, vec!["primaryValue", "collectionAmount"]);
        assert_eq!(config.rollup.linkage, LinkageRule::ZoneContainment);
        assert_eq!(config.report.decimals, 0);
    }

    #[test]
    fn test_options_include_achievement_metric() {
        let rollup = RollupConfig {
            metric_fields: vec!["primaryValue".to_string()],
            achievement_metric: "secondaryValue".to_string(),
            linkage: LinkageRule::SharedLeaves,
        };

        let options = rollup.options().unwrap();
        assert_eq!(options.metric_fields, vec!["primaryValue", "secondaryValue"]);
    }

    #[test]
    fn test_options_reject_reserved_metric() {
        let toml_content = r#"
[rollup]
metric_fields = ["primaryValue", "id"]
"#;
        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.rollup.options().is_err());

        let rollup = RollupConfig {
            achievement_metric: "target".to_string(),
            ..RollupConfig::default()
        };
        assert!(rollup.options().is_err());
    }

    #[test]
    fn test_verbose_from_config_raises_log_level() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[general]\nverbose = true\n").unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        let args = Args::parse_from(["salesroll"]);

        assert!(config.general.verbose);
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);
    }

    #[test]
    fn test_merge_with_args() {
        let args = Args::parse_from([
            "salesroll",
            "--base-url",
            "https://cli.example.com",
            "--metrics",
            "primaryValue,officeReturn",
            "--linkage",
            "zone-containment",
            "--timeout",
            "5",
        ]);
        let mut config = Config::default();
        config.source.base_url = Some("https://file.example.com".to_string());
        config.report.decimals = 3;

        config.merge_with_args(&args);

        assert_eq!(config.source.base_url.as_deref(), Some("https://cli.example.com"));
        assert_eq!(config.source.timeout_seconds, 5);
        assert_eq!(config.rollup.metric_fields, vec!["primaryValue", "officeReturn"]);
        assert_eq!(config.rollup.linkage, LinkageRule::ZoneContainment);
        assert_eq!(config.report.decimals, 3);
        assert!(matches!(args.linkage, Some(LinkageArg::ZoneContainment)));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join(CONFIG_FILE), "[report]\ndecimals = 1\n").unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.report.decimals, 1);
        assert_eq!(config.source.timeout_seconds, 60);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[rollup]"));
        assert!(toml_str.contains("linkage = \"shared-leaves\""));
    }
}
