//! rp-core: shared foundation for rapidprep.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real + tolerances + float helpers + nearest-value lookup)
//! - ids (reach identifiers and grid cell indices)
//! - error (shared error taxonomy)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{PrepError, PrepResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
