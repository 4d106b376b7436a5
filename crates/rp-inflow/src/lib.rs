//! rp-inflow: lateral inflow from gridded runoff for rapidprep.
//!
//! Contains:
//! - profile (GridProfile: per-product names, units and schedules)
//! - schedule (decumulation schedules, time signatures, schedule selection)
//! - decumulate (raw runoff to per-step increments)
//! - computer (InflowComputer: window read, weighting, per-reach sums)
//! - series (InflowSeries and the m3_riv NetCDF file)
//!
//! # Example
//!
//! ```
//! use rp_inflow::{Schedule, Segment, Accumulation};
//!
//! let hourly = Schedule {
//!     interval: "1hr".to_string(),
//!     step_hours: 1.0,
//!     time_signature: vec![],
//!     raw_time_len: None,
//!     segments: vec![Segment { start: 0, end: None, stride: 1 }],
//! };
//! let steps = hourly.plan(4, Accumulation::Cumulative).unwrap();
//! assert_eq!(steps.len(), 4);
//! assert_eq!(steps[3].baseline, Some(2));
//! ```

pub mod computer;
pub mod decumulate;
pub mod profile;
pub mod schedule;
pub mod series;

pub use computer::{InflowComputer, InflowOptions};
pub use decumulate::{decumulate, Increments};
pub use profile::{Accumulation, CoordinateNames, DimensionNames, GridProfile};
pub use schedule::{available_intervals, select_schedule, time_signature, Schedule, Segment, Step};
pub use series::{InflowSeries, INFLOW_VARIABLE, TIME_DIMENSION};
