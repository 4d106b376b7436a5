//! rp-network: river reach topology for rapidprep.
//!
//! Provides:
//! - Drainage feature readers (delimited text and GeoJSON properties)
//! - Connectivity builder with validation (duplicates, cycles, upstream cap)
//! - Connectivity and basin id file I/O
//!
//! # Example
//!
//! ```
//! use rp_network::{ConnectivityBuilder, ConnectivityOptions};
//!
//! let mut builder = ConnectivityBuilder::new(ConnectivityOptions::default());
//! builder.add_reach(101, None);
//! builder.add_reach(102, Some(101));
//! let network = builder.build().unwrap();
//!
//! assert_eq!(network.width(), 1);
//! assert_eq!(network.padded_row(0), vec![101, 0, 1, 102]);
//! assert_eq!(network.padded_row(1), vec![102, 101, 0, 0]);
//! ```

pub mod builder;
pub mod connectivity;
pub mod error;
pub mod features;
pub mod io;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::{ConnectivityBuilder, ConnectivityOptions, LinkSource, NodeLink};
pub use connectivity::{Connectivity, ConnectivityRow};
pub use error::NetworkError;
pub use features::{DrainageFields, DrainageRecord};
pub use io::{read_connectivity_csv, write_basin_id_csv, write_connectivity_csv};

/// Largest upstream width accepted by the routing model.
pub const MAX_UPSTREAM_LIMIT: usize = 12;
