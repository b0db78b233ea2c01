use crate::comparison_utils::ComparisonUtils;
use crate::detail_writer::{CsvComparisonWriter, ErrorsWriter};
use crate::result::ComparisonResult;
use crate::rows::RowsComparator;
use crate::table_comparator::DataComparator;
use crate::values::{DecimalValueTransformer, ValueTransformer, ValuesComparator};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tabcompare_common::{DataMapping, ResultType, TabCompareError, TableDataReader};
use tracing::{debug, info, warn};

pub const DETAILS_DIR: &str = "details";
pub const ERRORS_FILE: &str = "errors.txt";

/// Inputs of one comparison besides the two readers
#[derive(Clone)]
pub struct ComparisonSettings {
    pub output_dir: PathBuf,
    pub mapping: Option<Arc<DataMapping>>,
    pub comparison_utils: ComparisonUtils,
}

impl ComparisonSettings {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            mapping: None,
            comparison_utils: ComparisonUtils::new(),
        }
    }

    pub fn with_mapping(mut self, mapping: DataMapping) -> Self {
        self.mapping = Some(Arc::new(mapping));
        self
    }

    pub fn with_comparison_utils(mut self, utils: ComparisonUtils) -> Self {
        self.comparison_utils = utils;
        self
    }
}

/// Cooperative stop request for a running comparison
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub type ProgressCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Drives a whole comparison: builds the comparator, classifies every row,
/// writes per-category details and the errors log
#[derive(Clone)]
pub struct DataComparatorTool {
    transformer: Arc<dyn ValueTransformer>,
    progress: Option<ProgressCallback>,
}

impl DataComparatorTool {
    pub fn new() -> Self {
        Self {
            transformer: Arc::new(DecimalValueTransformer),
            progress: None,
        }
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn ValueTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Called with the number of processed rows after every row
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn compare(
        &self,
        expected: Box<dyn TableDataReader>,
        actual: Box<dyn TableDataReader>,
        settings: &ComparisonSettings,
    ) -> Result<ComparisonResult, TabCompareError> {
        self.compare_with_cancel(expected, actual, settings, None)
    }

    pub fn compare_with_cancel(
        &self,
        expected: Box<dyn TableDataReader>,
        actual: Box<dyn TableDataReader>,
        settings: &ComparisonSettings,
        cancel: Option<&CancellationToken>,
    ) -> Result<ComparisonResult, TabCompareError> {
        let mapping = settings.mapping.clone();
        let values = ValuesComparator::new(
            settings.comparison_utils.clone(),
            mapping.clone(),
            self.transformer.clone(),
        );
        let rows = RowsComparator::new(values, mapping.clone());
        let mut comparator = DataComparator::create(
            expected,
            actual,
            rows,
            mapping.as_deref(),
            self.transformer.clone(),
        )?;

        let result = self.run(&mut comparator, &settings.output_dir, cancel);
        let closed = comparator.close();
        let result = result?;
        closed?;
        Ok(result)
    }

    fn run(
        &self,
        comparator: &mut DataComparator,
        output_dir: &Path,
        cancel: Option<&CancellationToken>,
    ) -> Result<ComparisonResult, TabCompareError> {
        if !comparator.has_more_rows()? {
            info!("Both datasets are empty, nothing to compare");
            return Ok(ComparisonResult::nothing_to_compare());
        }

        let mut result = ComparisonResult::new();
        result.mark_started();
        fs::create_dir_all(output_dir)?;
        let details_dir = output_dir.join(DETAILS_DIR);
        info!("Comparing table data, reports go to {}", output_dir.display());

        let mut writers: BTreeMap<ResultType, CsvComparisonWriter> = BTreeMap::new();
        let mut errors: Option<ErrorsWriter> = None;

        loop {
            let data = comparator.compare_rows()?;
            result.record(data.result_type());
            let name = format!("Row #{}", result.total());

            let writer = match writers.entry(data.result_type()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    debug!("Creating {} details report", data.result_type());
                    entry.insert(CsvComparisonWriter::create(&details_dir, data.result_type())?)
                }
            };
            writer.write(&name, &data)?;

            if !data.errors().is_empty() {
                if errors.is_none() {
                    errors = Some(ErrorsWriter::create(output_dir.join(ERRORS_FILE))?);
                }
                if let Some(errors) = errors.as_mut() {
                    errors.write(&name, data.errors())?;
                }
            }

            if let Some(progress) = &self.progress {
                progress(result.total());
            }

            if cancel.map_or(false, |token| token.is_cancelled()) {
                info!("Comparison cancelled after {} row(s)", result.total());
                break;
            }
            if !comparator.has_more_rows()? {
                break;
            }
        }

        finish_writers(&mut result, writers, errors)?;
        result.mark_finished();
        info!(
            "Compared {} row(s): {} passed, {} failed, {} not found, {} extra",
            result.total(),
            result.passed(),
            result.failed(),
            result.not_found(),
            result.extra()
        );
        Ok(result)
    }
}

impl Default for DataComparatorTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Finalizes every report even if one of them fails; the first failure is returned
fn finish_writers(
    result: &mut ComparisonResult,
    writers: BTreeMap<ResultType, CsvComparisonWriter>,
    errors: Option<ErrorsWriter>,
) -> Result<(), TabCompareError> {
    let mut first_error = None;
    let mut keep_error = |e: TabCompareError| {
        if first_error.is_none() {
            first_error = Some(e);
        } else {
            warn!("Failed to finish report: {}", e);
        }
    };

    for writer in writers.into_values() {
        let result_type = writer.result_type();
        match writer.finish() {
            Ok(path) => result.set_details_path(result_type, path),
            Err(e) => keep_error(e),
        }
    }
    if let Some(errors) = errors {
        match errors.finish() {
            Ok(path) => result.set_errors_path(path),
            Err(e) => keep_error(e),
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
