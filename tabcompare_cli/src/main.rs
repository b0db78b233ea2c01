use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabcompare_common::{
    default_output_dir, load_config, load_mapping, DataMapping, FieldDesc, MappingDesc,
    PrecisionValue,
};
use tabcompare_core::{
    ComparisonResult, ComparisonResultWriter, ComparisonSettings, ComparisonUtils,
    CsvFileReader, DataComparatorTool,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_ARCHIVE_NAME: &str = "comparison_result.zip";

#[derive(Parser)]
#[command(name = "tabcompare")]
#[command(author = "TabCompare Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Row-by-row and key-based comparison of table data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare expected and actual CSV files
    Compare(CompareArgs),
}

#[derive(clap::Args)]
struct CompareArgs {
    /// Expected data (CSV with header)
    expected: PathBuf,

    /// Actual data (CSV with header)
    actual: PathBuf,

    /// Directory for detail reports
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Result archive path (defaults to comparison_result.zip in the output directory)
    #[arg(short, long)]
    archive: Option<PathBuf>,

    /// Column mapping file (TOML with [[fields]] tables)
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Key column; rows are paired by key instead of position (can be specified multiple times)
    #[arg(short, long)]
    key: Vec<String>,

    /// Numeric column with optional precision, e.g. amount=0.01 (can be specified multiple times)
    #[arg(short, long, value_name = "COLUMN[=PRECISION]")]
    numeric: Vec<String>,

    /// Column excluded from comparison (can be specified multiple times)
    #[arg(long)]
    ignore: Vec<String>,

    /// Column reported but never compared (can be specified multiple times)
    #[arg(long)]
    info: Vec<String>,

    /// Field delimiter of both files
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Compare @{...} expected values literally
    #[arg(long)]
    no_special_values: bool,

    /// Output the comparison result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    expected: &'a Path,
    actual: &'a Path,
    output_dir: &'a Path,
    archive: Option<&'a Path>,
    result: &'a ComparisonResult,
}

fn main() {
    // Initialize tracing to stderr (so JSON output can go cleanly to stdout)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compare(args) => match run_compare(args) {
            Ok(true) => {}
            Ok(false) => std::process::exit(2),
            Err(e) => {
                error!("Comparison failed: {:#}", e);
                std::process::exit(1);
            }
        },
    }
}

/// Returns whether every compared row passed
fn run_compare(args: CompareArgs) -> anyhow::Result<bool> {
    for path in [&args.expected, &args.actual] {
        if !path.is_file() {
            bail!("Input file does not exist: {}", path.display());
        }
    }

    let loaded = load_config(false)?;
    let config = loaded.config;

    let output_dir = match args.output_dir.clone().or(config.output_dir.clone()) {
        Some(dir) => dir,
        None => default_output_dir(loaded.portable, &loaded.path)?,
    };
    let delimiter_char = args.delimiter.unwrap_or(config.delimiter);
    let delimiter = u8::try_from(delimiter_char)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("Delimiter {:?} is not an ASCII character", delimiter_char))?;
    let special_values = config.special_values && !args.no_special_values;

    let desc = build_mapping(&args)?;
    let mut settings = ComparisonSettings::new(&output_dir)
        .with_comparison_utils(ComparisonUtils::new().with_special_values(special_values));
    if !desc.fields.is_empty() {
        settings = settings.with_mapping(DataMapping::new(&desc)?);
    }

    info!("Comparing:");
    info!("  Expected: {}", args.expected.display());
    info!("  Actual:   {}", args.actual.display());

    let progress = progress_bar(!args.json);
    let mut tool = DataComparatorTool::new();
    if let Some(bar) = progress.clone() {
        tool = tool.with_progress(Arc::new(move |rows| bar.set_position(rows)));
    }

    let result = tool.compare(
        Box::new(CsvFileReader::new(&args.expected).with_delimiter(delimiter)),
        Box::new(CsvFileReader::new(&args.actual).with_delimiter(delimiter)),
        &settings,
    );
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    let result = result?;

    let archive = if result.total() > 0 {
        let path = args
            .archive
            .clone()
            .unwrap_or_else(|| output_dir.join(DEFAULT_ARCHIVE_NAME));
        ComparisonResultWriter::new()
            .write(&result, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Some(path)
    } else {
        None
    };

    if args.json {
        let report = JsonReport {
            expected: &args.expected,
            actual: &args.actual,
            output_dir: &output_dir,
            archive: archive.as_deref(),
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&result, archive.as_deref());
    }

    Ok(result.is_success())
}

/// Mapping file fields, extended by the column flags given on the command line
fn build_mapping(args: &CompareArgs) -> anyhow::Result<MappingDesc> {
    let mut desc = match &args.mapping {
        Some(path) => load_mapping(path)?,
        None => MappingDesc::default(),
    };

    for column in &args.key {
        field(&mut desc, column).key = true;
    }
    for spec in &args.numeric {
        let (column, precision) = match spec.split_once('=') {
            Some((column, precision)) => (column.trim(), Some(precision.trim())),
            None => (spec.trim(), None),
        };
        let entry = field(&mut desc, column);
        entry.numeric = true;
        if let Some(precision) = precision {
            entry.precision = Some(PrecisionValue::Text(precision.to_string()));
        }
    }
    for column in &args.ignore {
        field(&mut desc, column).ignore = true;
    }
    for column in &args.info {
        field(&mut desc, column).info = true;
    }
    Ok(desc)
}

fn field<'a>(desc: &'a mut MappingDesc, column: &str) -> &'a mut FieldDesc {
    match desc.fields.iter().position(|f| f.local_name == column) {
        Some(index) => &mut desc.fields[index],
        None => {
            desc.fields.push(FieldDesc::new(column));
            let last = desc.fields.len() - 1;
            &mut desc.fields[last]
        }
    }
}

fn progress_bar(enabled: bool) -> Option<ProgressBar> {
    if !enabled || !std::io::stderr().is_terminal() {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} rows compared [{elapsed}]") {
        bar.set_style(style);
    }
    Some(bar)
}

fn print_summary(result: &ComparisonResult, archive: Option<&Path>) {
    println!("\n{}", "=".repeat(80));
    println!("Comparison Results");
    println!("{}", "=".repeat(80));
    if let Some(description) = result.description() {
        println!("{}", description);
    }
    println!("Rows compared:            {}", result.total());
    println!("Passed:                   {}", result.passed());
    println!("Failed:                   {}", result.failed());
    println!("Not found in actual data: {}", result.not_found());
    println!("Extra in actual data:     {}", result.extra());
    if let Some(errors) = result.errors_path() {
        println!("Field errors:             {}", errors.display());
    }
    if let Some(archive) = archive {
        println!("Report archive:           {}", archive.display());
    }
    println!("{}", "=".repeat(80));
}
