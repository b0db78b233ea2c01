use crate::comparison_utils::{parse_number, ComparisonUtils};
use rust_decimal::Decimal;
use std::sync::Arc;
use tabcompare_common::{DataMapping, ValueError};

/// Normalizes raw values of numeric columns before they are compared or hashed
pub trait ValueTransformer: Send + Sync {
    fn to_number(&self, column: &str, value: &str) -> Result<Decimal, ValueError>;

    /// Canonical text form of a numeric value, e.g. `"5.00"` becomes `"5"`
    fn transform(&self, column: &str, value: &str) -> Result<String, ValueError> {
        Ok(self.to_number(column, value)?.normalize().to_string())
    }
}

/// Parses values as arbitrary-precision decimals
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalValueTransformer;

impl ValueTransformer for DecimalValueTransformer {
    fn to_number(&self, column: &str, value: &str) -> Result<Decimal, ValueError> {
        parse_number(value).ok_or_else(|| ValueError::NotANumber {
            column: column.to_string(),
            value: value.to_string(),
        })
    }
}

/// True if two numbers differ by no more than `precision`
pub fn within_precision(expected: Decimal, actual: Decimal, precision: Decimal) -> bool {
    expected
        .checked_sub(actual)
        .map_or(false, |diff| diff.abs() <= precision)
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Field-level comparison: numeric tolerance for mapped numeric columns,
/// [`ComparisonUtils`] for everything else
#[derive(Clone)]
pub struct ValuesComparator {
    utils: ComparisonUtils,
    mapping: Option<Arc<DataMapping>>,
    transformer: Arc<dyn ValueTransformer>,
}

impl ValuesComparator {
    pub fn new(
        utils: ComparisonUtils,
        mapping: Option<Arc<DataMapping>>,
        transformer: Arc<dyn ValueTransformer>,
    ) -> Self {
        Self {
            utils,
            mapping,
            transformer,
        }
    }

    /// Plain comparator without mapping
    pub fn simple(utils: ComparisonUtils) -> Self {
        Self::new(utils, None, Arc::new(DecimalValueTransformer))
    }

    pub fn compare(
        &self,
        column: &str,
        expected: Option<&str>,
        actual: Option<&str>,
    ) -> Result<bool, ValueError> {
        match self.mapping.as_ref().and_then(|m| m.precision(column)) {
            Some(precision) => self.compare_numbers(column, expected, actual, precision),
            None => self.utils.compare_values(column, expected, actual),
        }
    }

    fn compare_numbers(
        &self,
        column: &str,
        expected: Option<&str>,
        actual: Option<&str>,
        precision: Decimal,
    ) -> Result<bool, ValueError> {
        match (non_empty(expected), non_empty(actual)) {
            (Some(e), Some(a)) => {
                let e = self.transformer.to_number(column, e)?;
                let a = self.transformer.to_number(column, a)?;
                Ok(within_precision(e, a, precision))
            }
            (e, a) => Ok(e.is_none() && a.is_none()),
        }
    }
}
