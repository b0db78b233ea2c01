use csv::WriterBuilder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tabcompare_common::{ResultType, RowComparisonData, TabCompareError};
use tempfile::NamedTempFile;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const ROW_KIND_EXPECTED: &str = "EXPECTED";
const ROW_KIND_ACTUAL: &str = "ACTUAL";

/// Incremental report of one result category: a zip archive holding a single
/// `<category>.csv` with an EXPECTED and an ACTUAL record per compared row
pub struct CsvComparisonWriter {
    result_type: ResultType,
    file: NamedTempFile,
    writer: csv::Writer<ZipWriter<File>>,
    header_written: bool,
    rows: u64,
}

impl CsvComparisonWriter {
    pub fn create(directory: &Path, result_type: ResultType) -> Result<Self, TabCompareError> {
        std::fs::create_dir_all(directory)?;
        let file = tempfile::Builder::new()
            .prefix(&format!("{}_", result_type.file_stem()))
            .suffix(".zip")
            .tempfile_in(directory)?;

        let mut zip = ZipWriter::new(file.as_file().try_clone()?);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(format!("{}.csv", result_type.file_stem()), options)?;

        Ok(Self {
            result_type,
            file,
            writer: WriterBuilder::new().flexible(true).from_writer(zip),
            header_written: false,
            rows: 0,
        })
    }

    pub fn write(&mut self, name: &str, data: &RowComparisonData) -> Result<(), TabCompareError> {
        if !self.header_written {
            let mut header = vec!["Comparison name", "Comparison result", "Row kind"];
            header.extend(data.columns());
            self.writer.write_record(&header)?;
            self.header_written = true;
        }

        let result = data.result_type().as_str();
        for (kind, expected) in [(ROW_KIND_EXPECTED, true), (ROW_KIND_ACTUAL, false)] {
            let mut record = vec![name, result, kind];
            record.extend(data.side_values(expected));
            self.writer.write_record(&record)?;
        }
        self.rows += 1;
        Ok(())
    }

    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Completes the archive and keeps it on disk
    pub fn finish(self) -> Result<PathBuf, TabCompareError> {
        let mut zip = self
            .writer
            .into_inner()
            .map_err(|e| TabCompareError::Io(e.into_error()))?;
        zip.finish()?;
        let path = self.file.into_temp_path().keep().map_err(|e| e.error)?;
        Ok(path)
    }
}

/// Plain text log of per-field errors, one block per affected row.
/// Written to a temp file next to `path` that only takes its final name in `finish`.
pub struct ErrorsWriter {
    path: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

impl ErrorsWriter {
    pub fn create(path: PathBuf) -> Result<Self, TabCompareError> {
        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory)?;
        let file = tempfile::Builder::new()
            .prefix("errors_")
            .suffix(".txt")
            .tempfile_in(directory)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn write(&mut self, name: &str, errors: &[String]) -> Result<(), TabCompareError> {
        writeln!(self.writer, "{}:", name)?;
        for error in errors {
            writeln!(self.writer, "  {}", error)?;
        }
        Ok(())
    }

    pub fn finish(self) -> Result<PathBuf, TabCompareError> {
        let file = self
            .writer
            .into_inner()
            .map_err(|e| TabCompareError::Io(e.into_error()))?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(self.path)
    }
}
