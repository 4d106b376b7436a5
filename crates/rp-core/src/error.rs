use thiserror::Error;

pub type PrepResult<T> = Result<T, PrepError>;

/// Error taxonomy shared by every pipeline stage.
#[derive(Error, Debug)]
pub enum PrepError {
    /// Bad or missing parameter, unsupported schedule/grid/CRS combination,
    /// malformed weight table.
    #[error("Configuration error: {what}")]
    Configuration { what: String },

    /// Missing dimension or variable, size mismatch, malformed input file.
    #[error("Data validation error: {what}")]
    DataValidation { what: String },

    /// Grid coordinate lookup failed even with the nearest-value fallback.
    #[error("Index resolution error: {what}")]
    IndexResolution { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrepError {
    pub fn config(what: impl Into<String>) -> Self {
        PrepError::Configuration { what: what.into() }
    }

    pub fn data(what: impl Into<String>) -> Self {
        PrepError::DataValidation { what: what.into() }
    }

    pub fn index(what: impl Into<String>) -> Self {
        PrepError::IndexResolution { what: what.into() }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, PrepError::Configuration { .. })
    }

    pub fn is_data_validation(&self) -> bool {
        matches!(self, PrepError::DataValidation { .. })
    }
}

impl From<csv::Error> for PrepError {
    fn from(err: csv::Error) -> Self {
        let what = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(e) => PrepError::Io(e),
            _ => PrepError::data(format!("malformed delimited text: {what}")),
        }
    }
}
