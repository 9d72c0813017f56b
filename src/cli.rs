//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::LinkageRule;
use crate::models::{is_reserved_field, Role};
use clap::Parser;
use std::path::PathBuf;

/// salesroll - sales hierarchy rollup for field-sales reporting
///
/// Rebuilds the SOM -> RSM -> ASM -> SO reporting tree from per-officer
/// sales figures, rolls totals up every tier, and writes a belt-by-belt
/// report. Data comes from local JSON exports or the sales backend.
///
/// Examples:
///   salesroll --leaves users.json --targets targets.json
///   salesroll --base-url https://pos.example.com --year 2026 --month 9
///   salesroll --leaves users.json --role asm --format csv -o asm.csv
///   salesroll --leaves users.json --dry-run
///   salesroll --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON export of the per-user sales report
    #[arg(short, long, value_name = "FILE")]
    pub leaves: Option<PathBuf>,

    /// JSON export of the monthly targets
    #[arg(short, long, value_name = "FILE")]
    pub targets: Option<PathBuf>,

    /// Sales backend base URL (used for inputs not given as files)
    #[arg(long, value_name = "URL", env = "SALESROLL_BASE_URL")]
    pub base_url: Option<String>,

    /// Bearer token for the sales backend
    #[arg(long, value_name = "TOKEN", env = "SALESROLL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Report year (defaults to the current year)
    #[arg(long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Report month, 1-12 (defaults to the current month)
    #[arg(long, value_name = "MONTH")]
    pub month: Option<u32>,

    /// Only include records of this role
    #[arg(long, value_name = "ROLE")]
    pub role: Option<RoleArg>,

    /// How managers are linked to their superiors
    #[arg(long, value_name = "RULE")]
    pub linkage: Option<LinkageArg>,

    /// Metric fields to roll up (comma-separated)
    ///
    /// Example: --metrics primaryValue,secondaryValue,collectionAmount
    #[arg(long, value_name = "FIELDS", value_delimiter = ',')]
    pub metrics: Option<Vec<String>>,

    /// Metric compared against target for achievement
    #[arg(long, value_name = "FIELD")]
    pub achievement_metric: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json, csv)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Decimal places for amounts in Markdown and CSV output
    #[arg(long, value_name = "N")]
    pub decimals: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .salesroll.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Fail if any manager's achievement is below this percentage
    ///
    /// Useful for scheduled checks. Exit code 2 when the threshold is missed.
    #[arg(long, value_name = "PCT")]
    pub fail_below: Option<f64>,

    /// Dry run: load data and print belt counts without writing a report
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .salesroll.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// CSV rows, one per record
    Csv,
}

/// Role accepted by --role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RoleArg {
    So,
    Asm,
    Rsm,
    Som,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::So => Role::So,
            RoleArg::Asm => Role::Asm,
            RoleArg::Rsm => Role::Rsm,
            RoleArg::Som => Role::Som,
        }
    }
}

/// Linkage rule accepted by --linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LinkageArg {
    /// Managers share at least one officer
    SharedLeaves,
    /// Child zone contains parent zone (legacy)
    ZoneContainment,
}

impl From<LinkageArg> for LinkageRule {
    fn from(arg: LinkageArg) -> Self {
        match arg {
            LinkageArg::SharedLeaves => LinkageRule::SharedLeaves,
            LinkageArg::ZoneContainment => LinkageRule::ZoneContainment,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err("Month must be between 1 and 12".to_string());
            }
        }

        if let Some(year) = self.year {
            if year < 1 {
                return Err("Year must be positive".to_string());
            }
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(threshold) = self.fail_below {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err("--fail-below must be a non-negative percentage".to_string());
            }
        }

        if let Some(ref metrics) = self.metrics {
            if metrics.iter().any(|m| m.trim().is_empty()) {
                return Err("Metric names must not be empty".to_string());
            }
            if let Some(name) = metrics.iter().find(|m| is_reserved_field(m)) {
                return Err(format!("Metric name '{}' clashes with a record field", name));
            }
        }
        if let Some(ref metric) = self.achievement_metric {
            if is_reserved_field(metric) {
                return Err(format!("Metric name '{}' clashes with a record field", metric));
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        for path in [&self.leaves, &self.targets].into_iter().flatten() {
            if !path.is_file() {
                return Err(format!("Input file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` comes from `[general] verbose`; `--quiet` beats both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
