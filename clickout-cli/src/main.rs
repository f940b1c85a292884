//! clickout CLI - mirror a ClickOnce deployment to disk
//!
//! ```text
//! clickout Tool.application -o mirror -v
//! ```

mod error;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use clickout::logging::{init_logging, level_for};
use clickout::{ConfigFile, FetchConfig, ManifestResolver, ResolveEvent, ResolveReport};

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "clickout")]
#[command(version, about = "Download every file of a ClickOnce deployment", long_about = None)]
struct Cli {
    /// Local path of the .application manifest
    manifest: PathBuf,

    /// Directory to mirror the deployment into [default: unpack]
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Configuration file (defaults to the per-user config.ini)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Timeout for each transfer in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Maximum manifest nesting to follow
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Also write debug logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Defaults, then the config file, then command-line overrides.
    fn fetch_config(&self) -> Result<FetchConfig, CliError> {
        let file = match &self.config {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load_default()?,
        };
        let mut config = file.apply(FetchConfig::default());

        if let Some(output) = &self.output {
            config.destination = output.clone();
        }
        if let Some(secs) = self.timeout {
            if secs == 0 {
                return Err(CliError::Config("--timeout must be positive".to_string()));
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(level_for(cli.verbose, cli.quiet), cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => return CliError::from(e).report(),
    };

    match run(&cli) {
        Ok(report) => {
            if !cli.quiet {
                print_summary(&report);
            }
            ExitCode::SUCCESS
        }
        Err(e) => e.report(),
    }
}

fn run(cli: &Cli) -> Result<ResolveReport, CliError> {
    let config = cli.fetch_config()?;
    debug!(?config, "Effective configuration");

    let spinner = if cli.quiet {
        ProgressBar::hidden()
    } else {
        new_spinner()
    };
    let events = spinner.clone();
    let resolver = ManifestResolver::from_config(&config)?.with_progress(Box::new(
        move |event: &ResolveEvent| match event {
            ResolveEvent::ManifestStarted { path, .. } => {
                events.set_message(format!("Reading {}", path.display()))
            }
            ResolveEvent::Fetched { path, .. } => {
                events.inc(1);
                events.set_message(format!("Fetched {}", path.display()));
            }
            ResolveEvent::Skipped { path, .. } => {
                events.inc(1);
                events.set_message(format!("Present {}", path.display()));
            }
        },
    ));

    let result = resolver.resolve_application(&cli.manifest, &config.destination);
    spinner.finish_and_clear();

    let report = result?;
    if !cli.quiet {
        println!(
            "{} {}",
            style("Mirrored into").green().bold(),
            config.destination.display()
        );
    }
    Ok(report)
}

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} [{pos} files] {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_summary(report: &ResolveReport) {
    println!("  Manifests:  {}", report.manifests);
    println!("  Downloaded: {} ({})", report.fetched, format_bytes(report.bytes_downloaded));
    println!("  Up to date: {}", style(report.skipped).dim());
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
