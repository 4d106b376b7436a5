//! Inflow computation against a runoff file.

use std::path::Path;

use rp_grid::{NetcdfSource, RunoffSource};
use rp_inflow::{available_intervals, GridProfile, InflowComputer, InflowOptions, InflowSeries};
use rp_weights::WeightTable;

use crate::error::AppResult;

pub fn compute_inflow(
    table: &WeightTable,
    runoff: &Path,
    profile: &GridProfile,
    options: InflowOptions,
) -> AppResult<InflowSeries> {
    let source = NetcdfSource::open(runoff)?;
    let computer = InflowComputer::new(profile.clone(), options);
    Ok(computer.compute(table, &source)?)
}

/// Interval labels `profile` can produce from this runoff file.
pub fn list_intervals(runoff: &Path, profile: &GridProfile) -> AppResult<Vec<String>> {
    let source = NetcdfSource::open(runoff)?;
    let times = match profile
        .coordinates
        .time
        .as_deref()
        .and_then(|name| source.variables().resolve(name))
    {
        Some(name) => Some(source.read_coordinate(name)?.iter().copied().collect::<Vec<f64>>()),
        None => None,
    };
    Ok(available_intervals(profile, times.as_deref())?)
}
