use crate::TabCompareError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Numeric precision as written in a mapping file: `precision = 0.5` or `precision = "0.5"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrecisionValue {
    Number(f64),
    Text(String),
}

impl PrecisionValue {
    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            PrecisionValue::Number(n) => Decimal::try_from(*n).ok(),
            PrecisionValue::Text(s) => Decimal::from_str(s.trim()).ok(),
        }
    }
}

/// Description of one column as given by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDesc {
    /// Name the column is compared under
    pub local_name: String,
    /// Column name in expected data, defaults to `local_name`
    #[serde(default)]
    pub expected_name: Option<String>,
    /// Column name in actual data, defaults to `local_name`
    #[serde(default)]
    pub actual_name: Option<String>,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub numeric: bool,
    #[serde(default)]
    pub precision: Option<PrecisionValue>,
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub info: bool,
}

impl FieldDesc {
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            ..Default::default()
        }
    }

    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    pub fn numeric(mut self, precision: &str) -> Self {
        self.numeric = true;
        self.precision = Some(PrecisionValue::Text(precision.to_string()));
        self
    }

    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn info(mut self) -> Self {
        self.info = true;
        self
    }

    pub fn with_names(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected_name = Some(expected.into());
        self.actual_name = Some(actual.into());
        self
    }
}

/// Mapping file contents: a list of `[[fields]]` tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingDesc {
    #[serde(default)]
    pub fields: Vec<FieldDesc>,
}

/// Column semantics resolved from a [`MappingDesc`]
#[derive(Debug, Clone, Default)]
pub struct DataMapping {
    expected_names: HashMap<String, String>,
    actual_names: HashMap<String, String>,
    key_columns: Vec<String>,
    numeric_columns: HashMap<String, Decimal>,
    ignore_columns: HashSet<String>,
    info_columns: HashSet<String>,
}

impl DataMapping {
    pub fn new(desc: &MappingDesc) -> Result<Self, TabCompareError> {
        let mut mapping = DataMapping::default();
        for field in &desc.fields {
            let local = field.local_name.trim();
            if local.is_empty() {
                return Err(TabCompareError::Config(
                    "Mapping field has an empty local name".to_string(),
                ));
            }
            let local = local.to_string();

            let expected = field.expected_name.clone().unwrap_or_else(|| local.clone());
            let actual = field.actual_name.clone().unwrap_or_else(|| local.clone());
            if expected != local {
                mapping.expected_names.insert(expected, local.clone());
            }
            if actual != local {
                mapping.actual_names.insert(actual, local.clone());
            }

            if field.key && !mapping.key_columns.contains(&local) {
                mapping.key_columns.push(local.clone());
            }
            if field.numeric {
                let precision = match &field.precision {
                    None => Decimal::ZERO,
                    Some(p) => p.to_decimal().filter(|d| !d.is_sign_negative()).ok_or_else(|| {
                        TabCompareError::Config(format!(
                            "Invalid precision {:?} for numeric column '{}'",
                            p, local
                        ))
                    })?,
                };
                mapping.numeric_columns.insert(local.clone(), precision);
            }
            if field.ignore {
                mapping.ignore_columns.insert(local.clone());
            }
            if field.info {
                mapping.info_columns.insert(local);
            }
        }
        Ok(mapping)
    }

    /// Rename map applied to the header of one side
    pub fn header_renames(&self, for_expected: bool) -> &HashMap<String, String> {
        if for_expected {
            &self.expected_names
        } else {
            &self.actual_names
        }
    }

    /// Key columns in mapping order
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    pub fn precision(&self, column: &str) -> Option<Decimal> {
        self.numeric_columns.get(column).copied()
    }

    pub fn is_ignore(&self, column: &str) -> bool {
        self.ignore_columns.contains(column)
    }

    pub fn is_info(&self, column: &str) -> bool {
        self.info_columns.contains(column)
    }
}
