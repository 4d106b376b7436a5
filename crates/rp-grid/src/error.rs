use rp_core::PrepError;

pub type GridResult<T> = Result<T, GridError>;

#[derive(thiserror::Error, Debug)]
pub enum GridError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Unknown dimension: {name}")]
    MissingDimension { name: String },

    #[error("Unknown variable: {name}")]
    MissingVariable { name: String },

    #[error("Hyperslab out of range for {name}: {what}")]
    OutOfRange { name: String, what: String },

    #[error("Shape mismatch for {name}: {what}")]
    Shape { name: String, what: String },
}

impl From<GridError> for PrepError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::Io(e) => PrepError::Io(e),
            other => PrepError::data(other.to_string()),
        }
    }
}
