use crate::values::ValuesComparator;
use std::sync::Arc;
use tabcompare_common::{
    DataMapping, ResultType, RowComparisonData, TabCompareError, TableHeader, TableRow,
};

/// Aggregates field comparisons of a row pair into one classified result
#[derive(Clone)]
pub struct RowsComparator {
    values: ValuesComparator,
    mapping: Option<Arc<DataMapping>>,
}

impl RowsComparator {
    pub fn new(values: ValuesComparator, mapping: Option<Arc<DataMapping>>) -> Self {
        Self { values, mapping }
    }

    pub fn compare_rows(
        &self,
        expected: Option<&TableRow>,
        actual: Option<&TableRow>,
        common_header: &TableHeader,
    ) -> Result<RowComparisonData, TabCompareError> {
        match (expected, actual) {
            (Some(e), Some(a)) => Ok(self.compare_pair(e, a, common_header)),
            (Some(_), None) => Ok(self.single_row(expected, None, ResultType::NotFound, common_header)),
            (None, Some(_)) => Ok(self.single_row(None, actual, ResultType::Extra, common_header)),
            (None, None) => Err(TabCompareError::Comparison(
                "Both rows to compare are absent".to_string(),
            )),
        }
    }

    fn compare_pair(
        &self,
        expected: &TableRow,
        actual: &TableRow,
        common_header: &TableHeader,
    ) -> RowComparisonData {
        let mut data = RowComparisonData::new(ResultType::Failed);
        for column in common_header.iter().filter(|c| !self.is_ignore(c)) {
            let e = expected.value(column);
            let a = actual.value(column);
            if self.is_info(column) || !expected.header().contains(column) {
                data.add_info_detail(column, e, a);
                continue;
            }
            match self.values.compare(column, e, a) {
                Ok(identical) => data.add_detail(column, e, a, identical),
                Err(err) => {
                    data.add_detail(column, e, a, false);
                    data.add_error(err.to_string());
                }
            }
        }
        data.complete_pair();
        data
    }

    fn single_row(
        &self,
        expected: Option<&TableRow>,
        actual: Option<&TableRow>,
        result_type: ResultType,
        common_header: &TableHeader,
    ) -> RowComparisonData {
        let mut data = RowComparisonData::new(result_type);
        for column in common_header.iter().filter(|c| !self.is_ignore(c)) {
            let e = expected.and_then(|r| r.value(column));
            let a = actual.and_then(|r| r.value(column));
            if self.is_info(column) {
                data.add_info_detail(column, e, a);
            } else {
                data.add_detail(column, e, a, false);
            }
        }
        data
    }

    fn is_ignore(&self, column: &str) -> bool {
        self.mapping.as_ref().map_or(false, |m| m.is_ignore(column))
    }

    fn is_info(&self, column: &str) -> bool {
        self.mapping.as_ref().map_or(false, |m| m.is_info(column))
    }
}
