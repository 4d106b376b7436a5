//! rp-grid: LSM grid access for rapidprep.
//!
//! Contains:
//! - names (case-insensitive name table built once per open file)
//! - lattice (rectilinear and curvilinear grid point coordinates)
//! - source (runoff sources: NetCDF files and in-memory grids)

pub mod error;
pub mod lattice;
pub mod names;
pub mod source;

pub use error::{GridError, GridResult};
pub use lattice::{LonConvention, LsmGrid};
pub use names::NameTable;
pub use source::{attribute_f64, attribute_text, MemoryRunoffSource, NetcdfSource, RunoffSource, Window};
