use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (duplicate column, bad range, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// The workbook has no sheet to work on.
    #[error("no worksheet found in workbook")]
    NoWorksheet,
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

/// Failure of a single reference lookup. Never aborts a batch.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup transport error: {0}")]
    Transport(String),
    #[error("lookup returned status {status} for '{id}'")]
    Status { id: String, status: u16 },
    #[error("cannot decode lookup response: {0}")]
    Decode(String),
}
