use crate::values::{non_empty, within_precision, ValueTransformer};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tabcompare_common::{DataMapping, TableHeader, TableRow};

/// Hashable part of a row's key: values of the key columns matched exactly
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey(Vec<Option<String>>);

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<&str> = self.0.iter().map(|v| v.as_deref().unwrap_or("")).collect();
        write!(f, "({})", values.join(", "))
    }
}

/// Extracts primary keys and decides whether two rows with equal keys match
pub enum TableRowMatcher {
    /// Every key column is part of the hashed key
    Exact { keys: Vec<String> },
    /// Numeric key columns are left out of the hashed key and compared
    /// within their precision once a bucket is found
    Numeric {
        keys: Vec<String>,
        numerics: Vec<(String, Decimal)>,
        transformer: Arc<dyn ValueTransformer>,
    },
}

impl TableRowMatcher {
    pub fn from_mapping(mapping: &DataMapping, transformer: Arc<dyn ValueTransformer>) -> Self {
        let mut keys = Vec::new();
        let mut numerics = Vec::new();
        for column in mapping.key_columns() {
            match mapping.precision(column) {
                Some(precision) => numerics.push((column.clone(), precision)),
                None => keys.push(column.clone()),
            }
        }

        if numerics.is_empty() {
            TableRowMatcher::Exact { keys }
        } else {
            TableRowMatcher::Numeric {
                keys,
                numerics,
                transformer,
            }
        }
    }

    pub fn primary_key(&self, row: &TableRow) -> PrimaryKey {
        let keys = match self {
            TableRowMatcher::Exact { keys } | TableRowMatcher::Numeric { keys, .. } => keys,
        };
        PrimaryKey(keys.iter().map(|k| row.value(k).map(str::to_string)).collect())
    }

    /// Secondary check for rows already sharing a [`PrimaryKey`]
    pub fn matches(&self, first: &TableRow, second: &TableRow) -> bool {
        let (numerics, transformer) = match self {
            TableRowMatcher::Exact { .. } => return true,
            TableRowMatcher::Numeric {
                numerics,
                transformer,
                ..
            } => (numerics, transformer),
        };

        numerics.iter().all(|(column, precision)| {
            match (non_empty(first.value(column)), non_empty(second.value(column))) {
                (Some(a), Some(b)) => {
                    match (transformer.to_number(column, a), transformer.to_number(column, b)) {
                        (Ok(a), Ok(b)) => within_precision(a, b, *precision),
                        _ => a == b,
                    }
                }
                (a, b) => a.is_none() && b.is_none(),
            }
        })
    }

    /// Key columns missing from `header`, in key order
    pub fn missing_columns<'a>(&'a self, header: &TableHeader) -> Vec<&'a str> {
        self.key_columns()
            .filter(|column| !header.contains(column))
            .collect()
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &str> {
        let (keys, numerics): (&[String], &[(String, Decimal)]) = match self {
            TableRowMatcher::Exact { keys } => (keys.as_slice(), &[][..]),
            TableRowMatcher::Numeric { keys, numerics, .. } => (keys.as_slice(), numerics.as_slice()),
        };
        keys.iter()
            .map(String::as_str)
            .chain(numerics.iter().map(|(column, _)| column.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::DecimalValueTransformer;
    use tabcompare_common::{FieldDesc, MappingDesc};

    fn matcher(fields: Vec<FieldDesc>) -> TableRowMatcher {
        let mapping = DataMapping::new(&MappingDesc { fields }).unwrap();
        TableRowMatcher::from_mapping(&mapping, Arc::new(DecimalValueTransformer))
    }

    fn row(values: &[&str]) -> TableRow {
        let header = Arc::new(TableHeader::new(["id", "amount", "v"]));
        TableRow::from_strings(header, values.iter().copied())
    }

    #[test]
    fn test_exact_key() {
        let m = matcher(vec![FieldDesc::new("id").key()]);
        assert!(matches!(m, TableRowMatcher::Exact { .. }));
        assert_eq!(m.primary_key(&row(&["1", "2", "x"])), m.primary_key(&row(&["1", "3", "y"])));
        assert_ne!(m.primary_key(&row(&["1", "2", "x"])), m.primary_key(&row(&["2", "2", "x"])));
        assert_eq!(m.primary_key(&row(&["7", "2", "x"])).to_string(), "(7)");
    }

    #[test]
    fn test_numeric_key_compared_within_precision() {
        let m = matcher(vec![
            FieldDesc::new("id").key(),
            FieldDesc::new("amount").key().numeric("0.01"),
        ]);
        let a = row(&["1", "10.00", "x"]);
        let b = row(&["1", "10.01", "y"]);
        let c = row(&["1", "10.05", "y"]);
        assert_eq!(m.primary_key(&a), m.primary_key(&b));
        assert!(m.matches(&a, &b));
        assert!(!m.matches(&a, &c));
        assert!(!m.matches(&a, &row(&["1", "", "x"])));
    }

    #[test]
    fn test_missing_columns() {
        let m = matcher(vec![FieldDesc::new("id").key(), FieldDesc::new("code").key()]);
        let header = TableHeader::new(["id", "v"]);
        assert_eq!(m.missing_columns(&header), vec!["code"]);
    }
}
