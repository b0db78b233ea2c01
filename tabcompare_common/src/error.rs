use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabCompareError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Comparison error: {0}")]
    Comparison(String),
}

pub type Result<T> = std::result::Result<T, TabCompareError>;

/// Problem with a single field value. Recorded on the row result, never aborts a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Column '{column}': value '{value}' is not a number")]
    NotANumber { column: String, value: String },

    #[error("Column '{column}': invalid expression '{expression}': {reason}")]
    InvalidExpression {
        column: String,
        expression: String,
        reason: String,
    },
}
