//! rp-cache: content-addressed weight table store.

pub mod hash;
pub mod store;
pub mod types;

pub use hash::{compute_weight_key, digest_bytes};
pub use store::WeightTableStore;
pub use types::*;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Weight table not cached: {key}")]
    NotFound { key: String },

    #[error("Weight table error: {0}")]
    Table(#[from] rp_core::PrepError),
}
