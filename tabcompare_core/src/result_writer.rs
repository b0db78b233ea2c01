use crate::result::{ComparisonResult, TIMESTAMP_FORMAT};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tabcompare_common::{ResultType, TabCompareError};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const SUMMARY_FILE: &str = "summary.txt";

/// Packs a finished [`ComparisonResult`] into a single archive: `summary.txt`,
/// one CSV per non-empty category and `errors.txt` if any field failed
#[derive(Debug, Clone, Copy, Default)]
pub struct ComparisonResultWriter;

impl ComparisonResultWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write(&self, result: &ComparisonResult, destination: &Path) -> Result<(), TabCompareError> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut summary = tempfile::Builder::new()
            .prefix("summary_")
            .suffix(".txt")
            .tempfile()?;
        summary.write_all(summary_text(result).as_bytes())?;
        summary.flush()?;

        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(File::create(destination)?);

        zip.start_file(SUMMARY_FILE, options)?;
        io::copy(&mut File::open(summary.path())?, &mut zip)?;

        for result_type in ResultType::ALL {
            if let Some(details) = result.details_path(result_type) {
                debug!("Adding {} to {}", details.display(), destination.display());
                let mut archive = ZipArchive::new(File::open(details)?)?;
                let mut entry = archive.by_index(0)?;
                zip.start_file(format!("{}.csv", result_type.file_stem()), options)?;
                io::copy(&mut entry, &mut zip)?;
            }
        }

        if let Some(errors) = result.errors_path() {
            zip.start_file(crate::tool::ERRORS_FILE, options)?;
            io::copy(&mut File::open(errors)?, &mut zip)?;
        }

        zip.finish()?;
        info!("Comparison report written to {}", destination.display());
        Ok(())
    }
}

/// Human readable summary stored as `summary.txt`
pub fn summary_text(result: &ComparisonResult) -> String {
    let mut lines = Vec::new();
    if let Some(started) = result.started() {
        lines.push(format!("Comparison started: {}", started.format(TIMESTAMP_FORMAT)));
    }
    if let Some(finished) = result.finished() {
        lines.push(format!("Comparison finished: {}", finished.format(TIMESTAMP_FORMAT)));
    }
    if let Some(description) = result.description() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(description.to_string());
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }

    lines.push(format!("Rows compared: {}", result.total()));
    lines.push(format!("Passed: {}", result.passed()));
    lines.push(format!("Failed: {}", result.failed()));
    lines.push(format!("Not found in actual data: {}", result.not_found()));
    lines.push(format!("Extra in actual data: {}", result.extra()));

    let mut text = lines.join("\n");
    text.push('\n');
    text
}
