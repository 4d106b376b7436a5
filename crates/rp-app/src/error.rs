//! Error types for the rp-app service layer.

use std::path::PathBuf;

use rp_core::PrepError;

/// Application error wrapping every backend crate's errors behind one
/// interface for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read input file: {path}")]
    InputFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data validation error: {0}")]
    DataValidation(String),

    #[error("Index resolution error: {0}")]
    IndexResolution(String),

    #[error("Grid file error: {0}")]
    Grid(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rp-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<PrepError> for AppError {
    fn from(err: PrepError) -> Self {
        match err {
            PrepError::Configuration { what } => AppError::Configuration(what),
            PrepError::DataValidation { what } => AppError::DataValidation(what),
            PrepError::IndexResolution { what } => AppError::IndexResolution(what),
            PrepError::Io(e) => AppError::Io(e),
        }
    }
}

impl From<rp_project::ProjectError> for AppError {
    fn from(err: rp_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<rp_grid::GridError> for AppError {
    fn from(err: rp_grid::GridError) -> Self {
        AppError::Grid(err.to_string())
    }
}

impl From<rp_cache::CacheError> for AppError {
    fn from(err: rp_cache::CacheError) -> Self {
        AppError::Cache(err.to_string())
    }
}
