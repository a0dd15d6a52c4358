//! ResumeRunner CLI Entry Point
//!
//! Runs the paused-run migration once, as a startup task, against the
//! file-backed stores in a state directory.
//!
//! # Usage
//!
//! ```bash
//! # Migrate using the default state directory
//! resumerunner
//!
//! # Preview the jobs that would be queued
//! resumerunner --dry-run
//!
//! # Use a config file and a specific state directory
//! resumerunner --config resumerunner.yaml --state-dir /var/lib/resumerunner
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use log::{error, info, warn};

use resumerunner::migration::{MigrationStatus, PausedRunMigration, ResumeJobComposer};
use resumerunner::store::{FileJobQueue, FileKeyValueStore, FileRunStore};
use resumerunner::{load_config, MigrationConfig, MigrationReport, APP_NAME, VERSION};

/// Command-line options parsed from arguments.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config_path: Option<PathBuf>,
    state_dir: Option<PathBuf>,
    marker_key: Option<String>,
    dry_run: bool,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Paused Run Migration");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: resumerunner [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config FILE       YAML configuration file");
    println!("  --state-dir PATH    Directory holding kv.json, runs.json and jobs.json");
    println!("  --marker-key KEY    Override the migration marker key");
    println!("  --dry-run           Compose jobs without submitting or marking");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  resumerunner");
    println!("  resumerunner --dry-run --verbose");
    println!("  resumerunner --config resumerunner.yaml --state-dir /var/lib/resumerunner");
}

/// Returns the value following an option, or an error naming the option.
fn option_value<'a>(args: &'a [String], i: &mut usize, option: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires an argument", option))
}

/// Parses command-line arguments into a CliArgs struct.
fn parse_arguments(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--dry-run" => cli.dry_run = true,
            "--verbose" | "-v" => cli.verbose = true,
            "--config" => {
                cli.config_path = Some(PathBuf::from(option_value(args, &mut i, "--config")?));
            }
            "--state-dir" => {
                cli.state_dir = Some(PathBuf::from(option_value(args, &mut i, "--state-dir")?));
            }
            "--marker-key" => {
                cli.marker_key = Some(option_value(args, &mut i, "--marker-key")?.to_string());
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            arg => return Err(format!("Unexpected argument: {}", arg)),
        }
        i += 1;
    }

    Ok(cli)
}

/// Builds the effective configuration: file values, then CLI overrides.
fn resolve_config(cli: &CliArgs) -> Result<MigrationConfig, Box<dyn std::error::Error>> {
    let mut config = match cli.config_path {
        Some(ref path) => load_config(path)?,
        None => MigrationConfig::default(),
    };

    if let Some(ref dir) = cli.state_dir {
        config.state_dir = dir.clone();
    }
    if let Some(ref key) = cli.marker_key {
        config.marker_key = key.clone();
    }
    config.dry_run |= cli.dry_run;
    config.validate()?;

    Ok(config)
}

/// Prints the outcome of the pass.
fn print_summary(report: &MigrationReport) {
    println!();
    match report.status {
        MigrationStatus::AlreadyCompleted => {
            println!("{}", "Migration already completed - nothing to do".green());
        }
        MigrationStatus::Completed => {
            println!("{}", "Migration completed".green().bold());
        }
        MigrationStatus::DryRun => {
            println!("{}", "Dry run finished - nothing was written".yellow());
        }
        MigrationStatus::Incomplete => {
            println!("{}", "Migration incomplete - will retry on next start".red().bold());
        }
    }
    println!("  Migrated:  {}", report.migrated_count);
    println!("  Duplicate: {}", report.duplicate_count);
    println!("  Skipped:   {}", report.skipped_count);
    println!("  Malformed: {}", report.malformed.len());
    println!("  Failed:    {}", report.failed.len());
}

/// Main application entry point.
async fn run() -> Result<MigrationReport, Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let cli = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(cli.verbose);
    print_banner();

    let config = resolve_config(&cli)?;
    info!("State directory: {}", config.state_dir.display());
    info!("Marker key: {}", config.marker_key);
    if config.dry_run {
        info!("Mode: DRY RUN (no jobs submitted, marker untouched)");
    }

    let mut migration = PausedRunMigration::new(
        Arc::new(FileKeyValueStore::new(&config.state_dir)),
        Arc::new(FileRunStore::new(&config.state_dir)),
        Arc::new(FileJobQueue::new(&config.state_dir)),
    );
    migration.set_marker_key(config.marker_key.clone());
    migration.set_dry_run(config.dry_run);
    migration.set_composer(ResumeJobComposer::with_schema_version(config.schema_version));

    let report = migration.run().await.map_err(|e| {
        error!("Migration aborted: {}", e);
        e
    })?;

    for failure in &report.failed {
        warn!("Run '{}' not migrated: {}", failure.execution_id, failure.error);
    }

    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(report) => {
            print_summary(&report);
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
