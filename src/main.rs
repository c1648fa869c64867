//! Email Domain Stats CLI - Command-line interface for per-domain customer counts
//!
//! CDD Principle: Application Layer - CLI coordinates user interactions with domain services
//! - Translates flags and config files into a validated StatsConfig
//! - Handles external concerns like file I/O, process exit codes, and terminal output
//! - Keeps stdout for results, logs and summaries go to stderr

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use email_domain_stats::{
    ConfigBuilder, EmailColumn, OutputFormat, ReportFormatter, RunSummary, StatsConfig,
    StatsProcessor, TracingSink,
};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

/// Config files picked up from the working directory when `--config` is absent
const DEFAULT_CONFIGS: [&str; 3] = [
    "email_domain_stats.yaml",
    "email_domain_stats.yml",
    ".email_domain_stats.yaml",
];

/// Email Domain Stats - distinct customers per email domain
#[derive(Parser)]
#[command(name = "email-domain-stats")]
#[command(version)]
#[command(about = "Count distinct customers per email domain in a CSV export")]
#[command(long_about = "Reads a CSV customer export in a single streaming pass, groups records by the domain of their email address and prints one `domain,count` line per domain, sorted case-insensitively.")]
struct Cli {
    /// Input CSV file (`-` for stdin)
    input: PathBuf,

    /// Write results to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormatArg>,

    /// Email column, as a 0-based index or a header name
    #[arg(long)]
    email_column: Option<String>,

    /// Field delimiter
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Accept rows whose field count differs from the header
    #[arg(long)]
    flexible: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormatArg,

    /// Print a run summary to stderr
    #[arg(long)]
    summary: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Csv,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum LogFormatArg {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    match run(&cli) {
        Ok(summary) => {
            if cli.summary {
                print_summary(&summary, !cli.no_color);
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary> {
    let config = resolve_config(cli)?;
    let format = config.output.format;
    let delimiter = config.delimiter_byte();
    let processor = StatsProcessor::new_with_config(config)?;

    let input = open_input(&cli.input)?;
    let (rows, summary) = processor
        .collect_rows(input, &mut TracingSink)
        .with_context(|| format!("failed to process '{}'", cli.input.display()))?;

    // Output is only opened once the input has been read successfully
    let mut output = open_output(cli.output.as_deref())?;
    ReportFormatter::new(delimiter).write_rows(&rows, format, &mut output)?;
    output.flush().context("failed to flush output")?;

    Ok(summary)
}

/// Load the config file (explicit or default) and apply command-line overrides
fn resolve_config(cli: &Cli) -> Result<StatsConfig> {
    let config = match &cli.config {
        Some(path) => StatsConfig::load_from_file(path)?,
        None => match DEFAULT_CONFIGS.iter().find(|name| Path::new(name).exists()) {
            Some(name) => {
                tracing::debug!("Using config file {}", name);
                StatsConfig::load_from_file(name)?
            }
            None => StatsConfig::default(),
        },
    };

    let mut builder = ConfigBuilder::from_config(config);
    if let Some(column) = &cli.email_column {
        builder = builder.email_column(column.parse::<EmailColumn>()?);
    }
    if let Some(delimiter) = cli.delimiter {
        builder = builder.delimiter(delimiter);
    }
    if cli.flexible {
        builder = builder.flexible(true);
    }
    if let Some(format) = cli.format {
        builder = builder.format(format.into());
    }

    Ok(builder.build()?)
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }

    let file = File::open(path)
        .with_context(|| format!("error while reading file '{}'", path.display()))?;
    Ok(Box::new(file))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file '{}'", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn init_logging(verbose: bool, format: LogFormatArg) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

#[cfg(feature = "colors")]
fn print_summary(summary: &RunSummary, use_colors: bool) {
    use colored::Colorize;

    colored::control::set_override(use_colors);
    let status = if summary.records_skipped == 0 {
        "✓".green()
    } else {
        "!".yellow()
    };
    eprintln!("{} {}", status, summary.format_display());
}

#[cfg(not(feature = "colors"))]
fn print_summary(summary: &RunSummary, _use_colors: bool) {
    eprintln!("{}", summary.format_display());
}
