//! rp-muskingum: Muskingum routing coefficients for rapidprep.
//!
//! Derives the travel time `kfac`, the calibrated `k = lambda * kfac` and
//! the weighting factor `x` of every reach, in connectivity order.
//!
//! # Example
//!
//! ```
//! use std::collections::{BTreeSet, HashMap};
//! use rp_muskingum::{MuskingumParameterBuilder, ReachAttributes};
//! use rp_network::{ConnectivityBuilder, ConnectivityOptions};
//!
//! let mut network = ConnectivityBuilder::new(ConnectivityOptions::default());
//! network.add_reach(1, None);
//! let network = network.build().unwrap();
//! let attributes = HashMap::from([(1, ReachAttributes { length: 3.6, slope: None })]);
//!
//! let params = MuskingumParameterBuilder::default()
//!     .build(&network, &attributes, &BTreeSet::new())
//!     .unwrap();
//! assert!((params.kfac[0] - 12960.0).abs() < 1e-6);
//! ```

pub mod builder;
pub mod formula;
pub mod io;

pub use builder::{
    attributes_from_drainage, LengthUnit, MuskingumOptions, MuskingumParameterBuilder,
    MuskingumParameters, ReachAttributes, FALLBACK_SLOPE,
};
pub use formula::KfacFormula;
pub use io::{read_column_csv, write_column_csv};
