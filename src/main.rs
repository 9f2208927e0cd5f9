//! tractstat - DSI Studio tract statistics aggregator
//!
//! A CLI tool that combines per-subject tractography stat files into
//! per-tract summaries, subject comparisons, and change-rate tables.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Missing input, bad configuration, or write failure

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod parser;
mod report;
mod resolver;

use analysis::{compute_change_rates, summarize, to_wide_table, Aggregator};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use crate::error::TractStatError;
use models::{ComparisonSource, RunMetadata, TractReport};
use report::TableWriter;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
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

    // Initialize logging
    init_logging(&args);

    info!("tractstat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_pipeline(args) {
        error!("Aggregation failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        if e
            .downcast_ref::<TractStatError>()
            .is_some_and(TractStatError::is_not_found)
        {
            eprintln!("   Run with --dry-run to list every expected input.");
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .tractstat.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize subjects, tract groups, and labels.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete aggregation workflow.
fn run_pipeline(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    info!("Results directory: {}", config.general.results_dir.display());

    let aggregator = Aggregator::from_config(&config).with_progress(!args.quiet);

    // Handle --dry-run: resolve files and exit
    if args.dry_run {
        return handle_dry_run(&config, &aggregator);
    }

    let subjects: Vec<String> = config.subjects.iter().map(|s| s.id.clone()).collect();

    // Step 1: Combine tract groups per subject
    println!(
        "🧠 Aggregating {} subjects x {} tract groups...",
        subjects.len(),
        config.tract_groups.len()
    );
    let metrics = aggregator
        .run(&subjects, &config.tract_groups)
        .context("Failed to aggregate tract metrics")?;

    // Step 2: Cross-subject statistics
    let summary = summarize(&metrics);

    let source = config.general.comparison_source;
    let comparison_metrics = match source {
        ComparisonSource::Groups => metrics.clone(),
        ComparisonSource::Structures => aggregator
            .collect_structure_metrics()
            .context("Failed to collect structure metrics")?,
    };
    if comparison_metrics.is_empty() {
        warn!("No metrics available for the {} comparison table", source);
    }
    let comparison = to_wide_table(&comparison_metrics, &config.subjects);
    debug!(
        "Comparison table: {} subjects, {} cells",
        comparison.subjects.len(),
        comparison.cell_count()
    );
    let change_rates = compute_change_rates(&comparison.subjects, &comparison);

    // Step 3: Write tables
    println!("\n📝 Writing tables...");
    let output_dir = config.output_dir().to_path_buf();
    let writer = TableWriter::new(output_dir.clone());
    let written = [
        writer.write_metrics(&metrics)?,
        writer.write_summary(&summary)?,
        writer.write_comparison(&comparison)?,
        writer.write_change_rates(&change_rates)?,
    ];

    let report = TractReport {
        metadata: RunMetadata {
            results_dir: config.general.results_dir.display().to_string(),
            run_date: Utc::now(),
            subjects,
            tract_groups: config.tract_groups.iter().map(|g| g.name.clone()).collect(),
            comparison_source: source,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        metrics,
        summary,
        comparison,
        change_rates,
    };

    let report_path = match args.format {
        OutputFormat::Csv => None,
        OutputFormat::Json => Some(report::write_json_report(&report, &output_dir)?),
        OutputFormat::Markdown => Some(report::write_markdown_report(&report, &output_dir)?),
    };

    // Print summary
    println!("\n📊 Aggregation Summary:");
    println!("   Rows: {}", report.metrics.len());
    for row in &report.summary {
        let fa = row
            .mean_fa
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "n/a".to_string());
        println!("   - {}: FA {} ± {:.4}", row.tract, fa, row.std_fa);
    }
    println!("   Duration: {:.2}s", report.metadata.duration_seconds);

    println!("\n✅ Done! Tables saved to: {}", output_dir.display());
    for path in written.iter().chain(report_path.iter()) {
        println!("   📄 {}", path.display());
    }

    Ok(())
}

/// Handle --dry-run: list what each subject would read, exit.
fn handle_dry_run(config: &Config, aggregator: &Aggregator) -> Result<()> {
    println!("\n🔍 Dry run: resolving stat files (nothing is written)...\n");

    let resolver = aggregator.resolver();
    resolver.check_results_root()?;

    let mut missing = 0;
    for subject in &config.subjects {
        println!("   {}", subject.id);

        let wholebrain = resolver.wholebrain_path(&subject.id);
        if wholebrain.is_file() {
            println!("     📄 {}", wholebrain.display());
        } else {
            missing += 1;
            println!("     ⚠️  missing {}", wholebrain.display());
        }

        for group in &config.tract_groups {
            match resolver.discover_group_files(&subject.id, group) {
                Ok(files) => {
                    println!("     {} ({} files)", group.name, files.len());
                    for file in files {
                        println!("       📄 {}", file.display());
                    }
                }
                Err(e) => {
                    missing += 1;
                    println!("     ⚠️  {}: {}", group.name, e);
                }
            }
        }
    }

    if missing > 0 {
        println!("\n⚠️  Dry run found {} missing inputs; a full run would fail.", missing);
    } else {
        println!("\n✅ Dry run complete. All inputs present.");
    }
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
