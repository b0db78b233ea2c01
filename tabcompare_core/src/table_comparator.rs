use crate::indexed_data::IndexedTableData;
use crate::matcher::TableRowMatcher;
use crate::rows::RowsComparator;
use crate::values::ValueTransformer;
use std::sync::Arc;
use tabcompare_common::{
    DataMapping, RowComparisonData, TabCompareError, TableDataReader, TableHeader, TableRow,
};
use tracing::{debug, info, warn};

/// Positional comparator: row N of the expected data against row N of the actual data
pub struct TableDataComparator {
    expected: Box<dyn TableDataReader>,
    actual: Box<dyn TableDataReader>,
    expected_header: Arc<TableHeader>,
    actual_header: Arc<TableHeader>,
    common_header: TableHeader,
    rows_comparator: RowsComparator,
    expected_read_more: bool,
    actual_read_more: bool,
    closed: bool,
}

impl TableDataComparator {
    /// Starts both readers and resolves their headers.
    /// Readers are closed again if this fails.
    pub fn new(
        expected: Box<dyn TableDataReader>,
        actual: Box<dyn TableDataReader>,
        rows_comparator: RowsComparator,
        mapping: Option<&DataMapping>,
    ) -> Result<Self, TabCompareError> {
        let mut comparator = Self {
            expected,
            actual,
            expected_header: Arc::default(),
            actual_header: Arc::default(),
            common_header: TableHeader::default(),
            rows_comparator,
            expected_read_more: false,
            actual_read_more: false,
            closed: false,
        };
        comparator.start(mapping)?;
        Ok(comparator)
    }

    fn start(&mut self, mapping: Option<&DataMapping>) -> Result<(), TabCompareError> {
        self.expected.start()?;
        self.actual.start()?;

        self.expected_header = Arc::new(side_header(self.expected.header()?, mapping, true)?);
        self.actual_header = Arc::new(side_header(self.actual.header()?, mapping, false)?);
        self.common_header = TableHeader::union(&self.expected_header, &self.actual_header);
        debug!(
            "Expected header {}, actual header {}",
            self.expected_header, self.actual_header
        );

        self.refresh()
    }

    fn refresh(&mut self) -> Result<(), TabCompareError> {
        self.expected_read_more = self.expected.has_more_data()?;
        self.actual_read_more = self.actual.has_more_data()?;
        Ok(())
    }

    pub fn has_more_rows(&mut self) -> Result<bool, TabCompareError> {
        self.refresh()?;
        Ok(self.expected_read_more || self.actual_read_more)
    }

    pub fn compare_rows(&mut self) -> Result<RowComparisonData, TabCompareError> {
        let expected = if self.expected_read_more {
            self.read_expected()?
        } else {
            None
        };
        let actual = if self.actual_read_more {
            self.read_actual()?
        } else {
            None
        };
        self.compare(expected.as_ref(), actual.as_ref())
    }

    fn compare(
        &self,
        expected: Option<&TableRow>,
        actual: Option<&TableRow>,
    ) -> Result<RowComparisonData, TabCompareError> {
        self.rows_comparator
            .compare_rows(expected, actual, &self.common_header)
    }

    fn read_expected(&mut self) -> Result<Option<TableRow>, TabCompareError> {
        let header = self.expected_header.clone();
        Ok(self.expected.read_row()?.map(|row| row.with_header(header)))
    }

    fn read_actual(&mut self) -> Result<Option<TableRow>, TabCompareError> {
        let header = self.actual_header.clone();
        Ok(self.actual.read_row()?.map(|row| row.with_header(header)))
    }

    pub fn expected_header(&self) -> &TableHeader {
        &self.expected_header
    }

    pub fn actual_header(&self) -> &TableHeader {
        &self.actual_header
    }

    pub fn common_header(&self) -> &TableHeader {
        &self.common_header
    }

    /// Closes both readers, even if closing the first one fails
    pub fn close(&mut self) -> Result<(), TabCompareError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let expected = self.expected.close();
        let actual = self.actual.close();
        expected?;
        actual
    }
}

impl Drop for TableDataComparator {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close table data readers: {}", e);
        }
    }
}

fn side_header(
    header: Arc<TableHeader>,
    mapping: Option<&DataMapping>,
    expected: bool,
) -> Result<TableHeader, TabCompareError> {
    let renames = match mapping {
        Some(mapping) if !mapping.header_renames(expected).is_empty() => {
            mapping.header_renames(expected)
        }
        _ => return Ok(header.as_ref().clone()),
    };

    let renamed = header.renamed(renames);
    if renamed.len() != header.len() {
        return Err(TabCompareError::Config(format!(
            "Renaming {} header {} produces duplicate column names",
            side_name(expected),
            header
        )));
    }
    Ok(renamed)
}

fn side_name(expected: bool) -> &'static str {
    if expected {
        "expected"
    } else {
        "actual"
    }
}

/// Key-based comparator. Rows without an immediate counterpart are buffered
/// until their key shows up on the other side or both inputs are exhausted.
pub struct IndexedTableDataComparator {
    base: TableDataComparator,
    matcher: TableRowMatcher,
    expected_storage: IndexedTableData,
    actual_storage: IndexedTableData,
}

impl IndexedTableDataComparator {
    pub fn new(
        base: TableDataComparator,
        matcher: TableRowMatcher,
    ) -> Result<Self, TabCompareError> {
        for (expected, header) in [(true, base.expected_header()), (false, base.actual_header())] {
            let missing = matcher.missing_columns(header);
            if !missing.is_empty() {
                return Err(TabCompareError::Config(format!(
                    "Problem occurred while validating {} header {}: header doesn't contain key column(s): {}",
                    side_name(expected),
                    header,
                    missing.join(", ")
                )));
            }
        }

        Ok(Self {
            base,
            matcher,
            expected_storage: IndexedTableData::new(),
            actual_storage: IndexedTableData::new(),
        })
    }

    pub fn has_more_rows(&mut self) -> Result<bool, TabCompareError> {
        let more = self.base.has_more_rows()?;
        Ok(more || !self.expected_storage.is_empty() || !self.actual_storage.is_empty())
    }

    pub fn compare_rows(&mut self) -> Result<RowComparisonData, TabCompareError> {
        loop {
            if !self.base.expected_read_more && !self.base.actual_read_more {
                return self.compare_buffered();
            }

            if self.base.expected_read_more {
                let expected = self.base.read_expected()?;
                if self.base.actual_read_more {
                    if let Some(actual) = self.base.read_actual()? {
                        self.actual_storage.add(self.matcher.primary_key(&actual), actual);
                    }
                }

                if let Some(expected) = expected {
                    let key = self.matcher.primary_key(&expected);
                    match self.actual_storage.find_and_remove(&key, &expected, &self.matcher) {
                        Some(actual) => return self.base.compare(Some(&expected), Some(&actual)),
                        None => self.expected_storage.add(key, expected),
                    }
                }
            } else if let Some(actual) = self.base.read_actual()? {
                let key = self.matcher.primary_key(&actual);
                match self.expected_storage.find_and_remove(&key, &actual, &self.matcher) {
                    Some(expected) => return self.base.compare(Some(&expected), Some(&actual)),
                    None => self.actual_storage.add(key, actual),
                }
            }

            self.base.refresh()?;
        }
    }

    /// Both inputs are exhausted: drain the expected buffer first, then the actual one
    fn compare_buffered(&mut self) -> Result<RowComparisonData, TabCompareError> {
        if let Some((key, expected)) = self.expected_storage.pop_first() {
            let actual = self
                .actual_storage
                .find_and_remove(&key, &expected, &self.matcher);
            return self.base.compare(Some(&expected), actual.as_ref());
        }
        if let Some((key, actual)) = self.actual_storage.pop_first() {
            let expected = self
                .expected_storage
                .find_and_remove(&key, &actual, &self.matcher);
            return self.base.compare(expected.as_ref(), Some(&actual));
        }
        Err(TabCompareError::Comparison(
            "No rows left to compare".to_string(),
        ))
    }

    pub fn close(&mut self) -> Result<(), TabCompareError> {
        self.base.close()
    }
}

/// Comparator variant chosen once per run
pub enum DataComparator {
    Positional(TableDataComparator),
    Indexed(IndexedTableDataComparator),
}

impl DataComparator {
    /// Keyed comparison if the mapping names at least one key column, positional otherwise
    pub fn create(
        expected: Box<dyn TableDataReader>,
        actual: Box<dyn TableDataReader>,
        rows_comparator: RowsComparator,
        mapping: Option<&DataMapping>,
        transformer: Arc<dyn ValueTransformer>,
    ) -> Result<Self, TabCompareError> {
        let base = TableDataComparator::new(expected, actual, rows_comparator, mapping)?;
        match mapping.filter(|m| !m.key_columns().is_empty()) {
            Some(mapping) => {
                info!("Comparing by key column(s): {}", mapping.key_columns().join(", "));
                let matcher = TableRowMatcher::from_mapping(mapping, transformer);
                Ok(DataComparator::Indexed(IndexedTableDataComparator::new(
                    base, matcher,
                )?))
            }
            None => {
                info!("Comparing rows by position");
                Ok(DataComparator::Positional(base))
            }
        }
    }

    pub fn has_more_rows(&mut self) -> Result<bool, TabCompareError> {
        match self {
            DataComparator::Positional(c) => c.has_more_rows(),
            DataComparator::Indexed(c) => c.has_more_rows(),
        }
    }

    pub fn compare_rows(&mut self) -> Result<RowComparisonData, TabCompareError> {
        match self {
            DataComparator::Positional(c) => c.compare_rows(),
            DataComparator::Indexed(c) => c.compare_rows(),
        }
    }

    pub fn common_header(&self) -> &TableHeader {
        match self {
            DataComparator::Positional(c) => c.common_header(),
            DataComparator::Indexed(c) => c.base.common_header(),
        }
    }

    pub fn close(&mut self) -> Result<(), TabCompareError> {
        match self {
            DataComparator::Positional(c) => c.close(),
            DataComparator::Indexed(c) => c.close(),
        }
    }
}
