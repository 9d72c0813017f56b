//! salesroll - sales hierarchy rollup
//!
//! A CLI tool that rebuilds the SOM -> RSM -> ASM -> SO reporting tree
//! from per-officer sales figures, rolls up totals at every tier, and
//! writes a belt-by-belt report.
//!
//! Exit codes:
//!   0 - Success (no manager below threshold, or no --fail-below set)
//!   1 - Runtime error (bad config, unreadable input, backend failure, etc.)
//!   2 - A manager's achievement is below the --fail-below threshold

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod source;

use analysis::HierarchyAggregator;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{BeltGroup, Period, Report, ReportMetadata, Role};
use source::{RollupInput, Session, SourcePlan};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging starts so `[general] verbose` applies
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, config.general.verbose);

    info!("salesroll v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_rollup(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Rollup failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .salesroll.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the backend URL, metric fields, and linkage rule.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = args.log_level(config_verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete rollup workflow. Returns exit code (0 or 2).
async fn run_rollup(args: Args, mut config: Config) -> Result<i32> {
    let start_time = Instant::now();

    config.merge_with_args(&args);
    debug!("Rollup settings: {:?}", config.rollup);

    let period = resolve_period(&args);
    let options = config.rollup.options()?;
    let role_filter = args.role.map(Role::from);

    // Step 1: Load officers and targets
    let plan = SourcePlan {
        leaves_path: config.source.leaves_path.clone(),
        targets_path: config.source.targets_path.clone(),
        base_url: config.source.base_url.clone(),
        timeout_seconds: config.source.timeout_seconds,
        session: Session::new(config.source.token.clone()),
        period,
        metric_fields: options.metric_fields.clone(),
    };

    println!("📥 Loading sales data for {} from {}", period, plan.origin());
    let spinner = if args.quiet {
        None
    } else {
        Some(fetch_spinner("Fetching officers and targets..."))
    };
    let loaded = source::load(&plan).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let input = loaded.context("Failed to load sales data")?;

    // Step 2: Aggregate
    println!("🧮 Rolling up {} officers ({} linkage)...", input.leaves.len(), options.linkage);
    let aggregator =
        HierarchyAggregator::new(options.clone()).with_directory(input.directory.clone());
    let groups = aggregator.aggregate(&input.leaves, &input.targets, role_filter);

    if args.dry_run {
        return handle_dry_run(&input, &groups, &options.metric_fields, &options.achievement_metric);
    }

    // Step 3: Build the report
    let summaries =
        analysis::summarize_belts(&groups, &options.metric_fields, &options.achievement_metric);

    let report = Report {
        metadata: ReportMetadata {
            source: input.origin.clone(),
            period,
            generated_at: Utc::now(),
            role_filter,
            linkage: options.linkage.to_string(),
            metric_fields: options.metric_fields.clone(),
            achievement_metric: options.achievement_metric.clone(),
            officers_loaded: input.leaves.len(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        summaries,
        groups,
    };

    // Step 4: Render and save
    println!("📝 Generating report...");
    let output = match args.format {
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Csv => report::generate_csv_report(&report, config.report.decimals)?,
    };

    let output_path = resolve_output_path(&args, &config);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Rollup Summary ({}):", period);
    if report.summaries.is_empty() {
        println!("   No records matched.");
    }
    for summary in &report.summaries {
        println!(
            "   {:<12} SO: {:>4} | ASM: {:>3} | RSM: {:>3} | SOM: {:>3} | achievement {:.1}%",
            summary.belt,
            summary.officers,
            summary.asms,
            summary.rsms,
            summary.soms,
            summary.achievement
        );
    }
    println!(
        "   Officers in report: {}",
        analysis::officer_count(&report.groups)
    );
    println!(
        "\n✅ Rollup complete! Report saved to: {}",
        output_path.display()
    );

    // Check --fail-below threshold
    if let Some(threshold) = args.fail_below {
        let below = analysis::managers_below(&report.groups, threshold);
        if !below.is_empty() {
            eprintln!(
                "\n⛔ {} manager(s) below {:.1}% achievement. Failing (exit code 2).",
                below.len(),
                threshold
            );
            for manager in below.iter().take(5) {
                eprintln!(
                    "   {} {} ({}): {:.1}%",
                    manager.role, manager.name, manager.zone, manager.achievement
                );
            }
            return Ok(2);
        }
    }

    Ok(0)
}

/// Handle --dry-run: show what was loaded and how it groups, write nothing.
fn handle_dry_run(
    input: &RollupInput,
    groups: &[BeltGroup],
    metric_fields: &[String],
    achievement_metric: &str,
) -> Result<i32> {
    println!("\n🔍 Dry run: no report will be written.\n");
    println!("   Officers loaded: {}", input.leaves.len());
    println!("   Managers in directory: {}", input.directory.len());
    println!("   Targets loaded: {}", input.targets.len());
    if input.skipped > 0 {
        println!("   Rows skipped: {}", input.skipped);
    }

    let summaries = analysis::summarize_belts(groups, metric_fields, achievement_metric);
    if summaries.is_empty() {
        println!("\n   No records matched.");
    } else {
        println!();
        for summary in &summaries {
            println!(
                "   📂 {}: {} SO, {} ASM, {} RSM, {} SOM",
                summary.belt, summary.officers, summary.asms, summary.rsms, summary.soms
            );
        }
    }

    println!("\n✅ Dry run complete.");
    Ok(0)
}

fn fetch_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Period from --year/--month, defaulting each part to the current month.
fn resolve_period(args: &Args) -> Period {
    let current = Period::current();
    Period {
        year: args.year.unwrap_or(current.year),
        month: args.month.unwrap_or(current.month),
    }
}

/// Explicit --output wins; otherwise the configured path with the
/// extension of the chosen format.
fn resolve_output_path(args: &Args, config: &Config) -> PathBuf {
    if let Some(ref path) = args.output {
        return path.clone();
    }

    let extension = match args.format {
        OutputFormat::Markdown => "md",
        OutputFormat::Json => "json",
        OutputFormat::Csv => "csv",
    };
    Path::new(&config.general.output).with_extension(extension)
}

/// Load configuration from file or use defaults.
///
/// Runs before the subscriber is installed, so problems go to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("Warning: ignoring {}: {:#}", CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
