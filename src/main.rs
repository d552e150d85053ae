//! CLI entry point for cheat-codes
//!
//! Provides a command-line interface for checking and listing the codes
//! file, writing a sample one, and listening for codes typed on stdin.

use anyhow::Context;
use cheat_codes::config::{
    find_duplicates, validate_entries, CodeBook, ConfigError, FileWatcher, DEFAULT_CODES_PATH,
};
use cheat_codes::core::CodeConfig;
use cheat_codes::detector::CodeDetector;
use cheat_codes::input::{pump_lines, InputBus};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::*;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often `listen --watch` checks for edits
const RELOAD_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "cheat-codes")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log matcher activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the codes file
    Check {
        /// Path to the codes file
        #[arg(short, long, default_value = DEFAULT_CODES_PATH)]
        codes: PathBuf,
    },

    /// List all codes
    List {
        /// Path to the codes file
        #[arg(short, long, default_value = DEFAULT_CODES_PATH)]
        codes: PathBuf,
    },

    /// Report codes typed on stdin
    Listen {
        /// Path to the codes file
        #[arg(short, long, default_value = DEFAULT_CODES_PATH)]
        codes: PathBuf,

        /// Reload codes when the file changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Write a sample codes file
    Init {
        /// Path to the codes file
        #[arg(short, long, default_value = DEFAULT_CODES_PATH)]
        codes: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check { codes } => check_codes(&codes)?,
        Commands::List { codes } => list_codes(&codes)?,
        Commands::Listen { codes, watch } => listen(&codes, watch)?,
        Commands::Init { codes, force } => init_codes(codes, force)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Check the codes file for syntax errors, invalid codes and duplicates
fn check_codes(codes_path: &Path) -> anyhow::Result<()> {
    let book = CodeBook::new(codes_path.to_path_buf())?;
    println!("{} Parsing codes: {}", "→".cyan(), book.path().display());

    let entries = match book.parse() {
        Ok(entries) => entries,
        Err(e) => {
            println!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };
    println!("{} Found {} codes\n", "✓".green(), entries.len());

    for duplicate in find_duplicates(&entries) {
        let lines: Vec<String> = duplicate.lines.iter().map(ToString::to_string).collect();
        println!(
            "{} '{}' is defined on lines {}",
            "⚠".yellow(),
            duplicate.code.cyan(),
            lines.join(", ")
        );
    }

    let issues = validate_entries(&entries);
    if issues.is_empty() {
        println!("{} {}", "✓".green().bold(), "All codes are valid!".bold());
        return Ok(());
    }

    println!(
        "{} Found {} invalid code{}:\n",
        "✗".red().bold(),
        issues.len(),
        if issues.len() == 1 { "" } else { "s" }
    );
    for issue in &issues {
        println!("  {} {}", format!("line {}:", issue.line).dimmed(), issue.error);
    }
    std::process::exit(1);
}

/// List every code with its timing windows
fn list_codes(codes_path: &Path) -> anyhow::Result<()> {
    let book = CodeBook::new(codes_path.to_path_buf())?;
    let entries = book.parse()?;

    println!("{}", format!("Codes from: {}\n", book.path().display()).bold());

    for entry in &entries {
        println!(
            "{} {} → {} {}",
            format!("{:>4}", entry.line).dimmed(),
            format!("{}", entry.config.kind()).magenta(),
            entry.config.code.cyan().bold(),
            describe_windows(&entry.config).dimmed(),
        );
    }

    println!("\n{} Total: {} codes", "✓".green(), entries.len());
    Ok(())
}

fn describe_windows(config: &CodeConfig) -> String {
    match (config.timeout_per_character, config.overall_timeout) {
        (None, None) => String::new(),
        (Some(each), None) => format!("(≤{}ms between keys)", each),
        (None, Some(span)) => format!("(within {}ms)", span),
        (Some(each), Some(overall)) => {
            format!("(≤{}ms between keys, within {}ms)", each, overall)
        }
    }
}

/// Write the sample codes file
fn init_codes(codes_path: PathBuf, force: bool) -> anyhow::Result<()> {
    match CodeBook::init(codes_path, force) {
        Ok(book) => {
            println!(
                "{} Wrote sample codes to {}",
                "✓".green(),
                book.path().display()
            );
            Ok(())
        }
        Err(ConfigError::AlreadyExists(path)) => {
            println!("{} {} already exists", "⚠".yellow(), path.display());
            println!("Use {} to overwrite it.", "--force".bold());
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Listen on stdin until it closes or Ctrl-C
fn listen(codes_path: &Path, watch: bool) -> anyhow::Result<()> {
    let book = CodeBook::new(codes_path.to_path_buf())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the runtime")?;

    let result = runtime.block_on(run_listener(book, watch));

    // The stdin reader may still be blocked in a read
    runtime.shutdown_background();
    result
}

async fn run_listener(book: CodeBook, watch: bool) -> anyhow::Result<()> {
    let bus = Arc::new(InputBus::new());
    let mut detector = CodeDetector::with_bus(bus.clone(), Arc::new(report_match));
    let loaded = detector.load(book.load()?.into_iter().map(|entry| entry.config))?;

    eprintln!(
        "{} Listening for {} code{} from {}",
        "→".cyan(),
        loaded,
        if loaded == 1 { "" } else { "s" },
        book.path().display()
    );

    let watcher = if watch { Some(book.watch()?) } else { None };
    let mut reader = tokio::task::spawn_blocking(move || pump_lines(io::stdin().lock(), &bus));
    let mut reload_tick = tokio::time::interval(RELOAD_POLL_INTERVAL);

    loop {
        tokio::select! {
            finished = &mut reader => {
                let keystrokes = finished.context("stdin reader failed")??;
                info!(keystrokes, "stdin closed");
                break;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("interrupted");
                break;
            }
            _ = reload_tick.tick(), if watcher.is_some() => {
                if watcher.as_ref().is_some_and(FileWatcher::check_for_changes) {
                    reload(&book, &mut detector);
                }
            }
        }
    }

    detector.close().await;
    Ok(())
}

/// Re-read the codes file, keeping the running codes if it is broken
fn reload(book: &CodeBook, detector: &mut CodeDetector) {
    let loaded = book
        .load()
        .map_err(anyhow::Error::from)
        .and_then(|entries| {
            Ok(detector.load(entries.into_iter().map(|entry| entry.config))?)
        });

    match loaded {
        Ok(count) => eprintln!("{} Reloaded {} codes", "↻".cyan(), count),
        Err(e) => eprintln!(
            "{} Reload failed, keeping current codes: {}",
            "✗".red(),
            e
        ),
    }
}

fn report_match(config: &CodeConfig) {
    println!(
        "{} {} {} {}",
        format!("[{}]", Local::now().format("%H:%M:%S")).dimmed(),
        "✓".green().bold(),
        config.code.cyan().bold(),
        format!("({})", config.kind()).magenta(),
    );
}
