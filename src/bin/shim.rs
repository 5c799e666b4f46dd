//! Shim CLI - Command-line interface for Synheart Shim
//!
//! Commands:
//! - map: Map raw provider responses into canonical data points
//! - categories: List supported provider/category pairs

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

use synheart_shim::registry::{self, parse_documents_json, parse_documents_ndjson, SUPPORTED};
use synheart_shim::{AnyDataPoint, Category, MappingError, MappingReport, Provider};
use synheart_shim::{PRODUCER_NAME, SHIM_VERSION};

/// Shim - Map health data provider responses into canonical data points
#[derive(Parser)]
#[command(name = "shim")]
#[command(author = "Synheart AI Inc")]
#[command(version = SHIM_VERSION)]
#[command(about = "Map health provider API responses to canonical data points", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map raw provider responses into canonical data points
    Map {
        /// Provider name (e.g. ihealth, googlefit)
        #[arg(short, long)]
        provider: String,

        /// Category name (e.g. blood-pressure, heart-rate)
        #[arg(short, long)]
        category: String,

        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Print a report of skipped records to stderr
        #[arg(long)]
        report: bool,
    },

    /// List supported provider/category pairs
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// A response document, or a JSON array of response documents
    Json,
    /// Newline-delimited JSON (one response document per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// JSON array of data points
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Newline-delimited JSON (one data point per line)
    Ndjson,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<(), ShimCliError> {
    match cli.command {
        Commands::Map {
            provider,
            category,
            input,
            output,
            input_format,
            output_format,
            report,
        } => cmd_map(
            &provider,
            &category,
            &input,
            &output,
            input_format,
            output_format,
            report,
        ),

        Commands::Categories { json } => cmd_categories(json),
    }
}

fn cmd_map(
    provider: &str,
    category: &str,
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    report: bool,
) -> Result<(), ShimCliError> {
    let provider_id = Provider::parse(provider)
        .ok_or_else(|| ShimCliError::UnknownProvider(provider.to_string()))?;
    let category_id = Category::parse(category)
        .ok_or_else(|| ShimCliError::UnknownCategory(category.to_string()))?;

    let input_data = read_input(input)?;

    let documents = match input_format {
        InputFormat::Json => parse_documents_json(&input_data)?,
        InputFormat::Ndjson => parse_documents_ndjson(&input_data)?,
    };

    if documents.is_empty() {
        return Err(ShimCliError::NoDocuments);
    }
    debug!(documents = documents.len(), provider, category, "mapping input");

    let mapped = registry::map_documents(provider_id, category_id, &documents)?;

    let output_data = format_output(&mapped.points, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    if report {
        eprintln!("{}", serde_json::to_string_pretty(&MapReport::new(&mapped))?);
    }

    Ok(())
}

fn read_input(input: &Path) -> Result<String, ShimCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(ShimCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_categories(json: bool) -> Result<(), ShimCliError> {
    let entries: Vec<CategoryEntry> = SUPPORTED
        .iter()
        .map(|(provider, category)| CategoryEntry {
            provider: provider.as_str(),
            category: category.as_str(),
            source_name: provider.source_name(),
        })
        .collect();

    if json {
        let listing = CategoryListing {
            producer: PRODUCER_NAME,
            version: SHIM_VERSION,
            categories: entries,
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for entry in &entries {
            println!("{:<12} {}", entry.provider, entry.category);
        }
    }

    Ok(())
}

fn format_output(points: &[AnyDataPoint], format: &OutputFormat) -> Result<String, ShimCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for point in points {
                lines.push(serde_json::to_string(point)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(points)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(points)? + "\n"),
    }
}

enum ShimCliError {
    Io(io::Error),
    Mapping(MappingError),
    Json(serde_json::Error),
    UnknownProvider(String),
    UnknownCategory(String),
    NoInput,
    NoDocuments,
}

impl From<io::Error> for ShimCliError {
    fn from(e: io::Error) -> Self {
        ShimCliError::Io(e)
    }
}

impl From<MappingError> for ShimCliError {
    fn from(e: MappingError) -> Self {
        ShimCliError::Mapping(e)
    }
}

impl From<serde_json::Error> for ShimCliError {
    fn from(e: serde_json::Error) -> Self {
        ShimCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ShimCliError> for CliError {
    fn from(e: ShimCliError) -> Self {
        match e {
            ShimCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ShimCliError::Mapping(e @ MappingError::UnsupportedUnit { .. }) => CliError {
                code: "UNSUPPORTED_UNIT".to_string(),
                message: e.to_string(),
                hint: Some("The response declares a unit code this provider mapping does not know".to_string()),
            },
            ShimCliError::Mapping(e @ MappingError::UnknownCategory { .. }) => CliError {
                code: "UNKNOWN_CATEGORY".to_string(),
                message: e.to_string(),
                hint: Some("Run 'shim categories' to list supported pairs".to_string()),
            },
            ShimCliError::Mapping(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the input format".to_string()),
            },
            ShimCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ShimCliError::UnknownProvider(name) => CliError {
                code: "UNKNOWN_PROVIDER".to_string(),
                message: format!("Unknown provider '{}'", name),
                hint: Some("Run 'shim categories' to list supported providers".to_string()),
            },
            ShimCliError::UnknownCategory(name) => CliError {
                code: "UNKNOWN_CATEGORY".to_string(),
                message: format!("Unknown category '{}'", name),
                hint: Some("Run 'shim categories' to list supported categories".to_string()),
            },
            ShimCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a TTY and no input file was given".to_string(),
                hint: Some("Pipe responses into shim or pass --input <file>".to_string()),
            },
            ShimCliError::NoDocuments => CliError {
                code: "NO_DOCUMENTS".to_string(),
                message: "No response documents found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct MapReport {
    producer: &'static str,
    version: &'static str,
    documents: usize,
    points: usize,
    excluded: usize,
    dropped: usize,
    skipped: Vec<SkippedDetail>,
}

impl MapReport {
    fn new(report: &MappingReport<AnyDataPoint>) -> Self {
        MapReport {
            producer: PRODUCER_NAME,
            version: SHIM_VERSION,
            documents: report.documents,
            points: report.points.len(),
            excluded: report.excluded_count(),
            dropped: report.dropped_count(),
            skipped: report
                .skipped
                .iter()
                .map(|s| SkippedDetail {
                    document_index: s.document_index,
                    record_index: s.record_index,
                    reason: s.reason.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(serde::Serialize)]
struct SkippedDetail {
    document_index: usize,
    record_index: Option<usize>,
    reason: String,
}

#[derive(serde::Serialize)]
struct CategoryListing {
    producer: &'static str,
    version: &'static str,
    categories: Vec<CategoryEntry>,
}

#[derive(serde::Serialize)]
struct CategoryEntry {
    provider: &'static str,
    category: &'static str,
    source_name: &'static str,
}
