use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Classification of one compared pair or lone row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    /// Both rows present, every compared field identical
    Passed,
    /// Both rows present, at least one field differs
    Failed,
    /// Row exists only in expected data
    NotFound,
    /// Row exists only in actual data
    Extra,
}

impl ResultType {
    pub const ALL: [ResultType; 4] = [
        ResultType::Passed,
        ResultType::Failed,
        ResultType::NotFound,
        ResultType::Extra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Passed => "PASSED",
            ResultType::Failed => "FAILED",
            ResultType::NotFound => "NOT_FOUND",
            ResultType::Extra => "EXTRA",
        }
    }

    /// Base name used for report files of this category
    pub fn file_stem(&self) -> &'static str {
        match self {
            ResultType::Passed => "passed",
            ResultType::Failed => "failed",
            ResultType::NotFound => "not_found",
            ResultType::Extra => "extra",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison of one column within a row pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnComparisonDetail {
    pub column: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub identical: bool,
    /// Reported only, never affects the row classification
    pub info: bool,
}

/// Outcome of comparing one (expected, actual) row pair
#[derive(Debug, Clone, Serialize)]
pub struct RowComparisonData {
    result_type: ResultType,
    details: Vec<ColumnComparisonDetail>,
    errors: Vec<String>,
}

impl RowComparisonData {
    pub fn new(result_type: ResultType) -> Self {
        Self {
            result_type,
            details: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_detail(
        &mut self,
        column: &str,
        expected: Option<&str>,
        actual: Option<&str>,
        identical: bool,
    ) {
        self.details.push(ColumnComparisonDetail {
            column: column.to_string(),
            expected: expected.map(str::to_string),
            actual: actual.map(str::to_string),
            identical,
            info: false,
        });
    }

    pub fn add_info_detail(&mut self, column: &str, expected: Option<&str>, actual: Option<&str>) {
        self.details.push(ColumnComparisonDetail {
            column: column.to_string(),
            expected: expected.map(str::to_string),
            actual: actual.map(str::to_string),
            identical: true,
            info: true,
        });
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Settles PASSED/FAILED for a pair where both rows were present
    pub fn complete_pair(&mut self) {
        self.result_type = if self.details.iter().all(|d| d.info || d.identical) {
            ResultType::Passed
        } else {
            ResultType::Failed
        };
    }

    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    pub fn details(&self) -> &[ColumnComparisonDetail] {
        &self.details
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_success(&self) -> bool {
        self.result_type == ResultType::Passed
    }

    /// Column names in detail order, used as the CSV report header
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.details.iter().map(|d| d.column.as_str())
    }

    /// Values of one side in detail order, `None` rendered as empty
    pub fn side_values(&self, expected: bool) -> impl Iterator<Item = &str> {
        self.details.iter().map(move |d| {
            let value = if expected { &d.expected } else { &d.actual };
            value.as_deref().unwrap_or("")
        })
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default directory for comparison reports
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// CSV field delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Whether `@{...}` expected-value expressions are evaluated
    #[serde(default = "default_true")]
    pub special_values: bool,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}

fn default_delimiter() -> char {
    ','
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            delimiter: default_delimiter(),
            special_values: true,
            portable_mode: false,
        }
    }
}

/// Identifier of a background comparison task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
