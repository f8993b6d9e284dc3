use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesInsightsError {
    #[error("Workbook format error: {0}")]
    Format(String),

    #[error("Failed to parse field '{field}': {details}")]
    Parse { field: String, details: String },

    #[error("Cannot compute metrics over an empty table")]
    EmptyInput,

    #[error("Insufficient history for forecasting: {0} distinct day(s), need at least 2")]
    InsufficientData(usize),

    #[error("Invalid interval width {0}: must be strictly between 0.0 and 1.0")]
    InvalidIntervalWidth(f64),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SalesInsightsError {
    pub(crate) fn parse(field: &str, details: impl Into<String>) -> Self {
        Self::Parse {
            field: field.to_string(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SalesInsightsError>;
