use thiserror::Error;

/// Failures reading or writing a workbook.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to open workbook: {0}")]
    Open(String),

    #[error("workbook contains no sheets")]
    NoSheets,

    #[error("sheet '{name}': {message}")]
    Sheet { name: String, message: String },

    #[error("failed to write workbook: {0}")]
    Write(String),
}
