use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Xlsx(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Workbook {0} has no worksheets")]
    EmptyWorkbook(PathBuf),

    #[error("Unsupported input file {0}: expected .csv, .xlsx, .xlsm, .xls or .ods")]
    UnsupportedInput(PathBuf),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid source {path}: {reason}")]
    InvalidSource { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;
