//! rp-weights: catchment-to-grid area weights for rapidprep.
//!
//! Contains:
//! - crs (accepted catchment CRSs and the inverse Web Mercator projection)
//! - catchment (GeoJSON catchment polygons keyed by reach id)
//! - thiessen (Thiessen cells of rectilinear and curvilinear grids, R-tree indexed)
//! - builder (WeightTableBuilder)
//! - table (WeightTable records and CSV I/O)
//! - inspect (GeoJSON dumps of grid points and cells)
//! - reservoir (drainage lines crossing reservoir polygons)

pub mod builder;
pub mod catchment;
pub mod crs;
pub mod inspect;
pub mod reservoir;
pub mod table;
pub mod thiessen;

pub use builder::{WeightBuild, WeightOptions, WeightTableBuilder};
pub use catchment::{Catchment, CatchmentSet};
pub use crs::Crs;
pub use inspect::{write_grid_cells_geojson, write_grid_points_geojson};
pub use reservoir::{parse_reservoir_reaches, reservoir_reaches};
pub use table::{IndexLabels, ReachGroup, WeightRecord, WeightTable};
pub use thiessen::{GridCell, Tessellation};
