//! Weighted runoff accumulation per reach.

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use rp_core::{PrepError, PrepResult};
use rp_grid::{RunoffSource, Window};
use rp_weights::WeightTable;

use crate::decumulate::decumulate;
use crate::profile::GridProfile;
use crate::schedule::select_schedule;
use crate::series::InflowSeries;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InflowOptions {
    /// Interval label; the coarsest matching schedule when `None`.
    pub interval: Option<String>,
    /// Replace negative increments with zero.
    pub clamp_negative: bool,
}

#[derive(Debug, Clone)]
pub struct InflowComputer {
    profile: GridProfile,
    options: InflowOptions,
}

impl InflowComputer {
    pub fn new(profile: GridProfile, options: InflowOptions) -> Self {
        Self { profile, options }
    }

    pub fn profile(&self) -> &GridProfile {
        &self.profile
    }

    pub fn options(&self) -> &InflowOptions {
        &self.options
    }

    pub fn compute(&self, table: &WeightTable, source: &dyn RunoffSource) -> PrepResult<InflowSeries> {
        if table.is_empty() {
            return Err(PrepError::config("weight table has no rows"));
        }
        let groups = table.groups()?;

        let dims = &self.profile.dimensions;
        let dim = |name: &str| -> PrepResult<(String, usize)> {
            let canonical = source
                .dimensions()
                .resolve(name)
                .ok_or_else(|| PrepError::data(format!("runoff file has no dimension '{name}'")))?;
            let len = source
                .dimension_len(canonical)
                .ok_or_else(|| PrepError::data(format!("runoff file has no dimension '{name}'")))?;
            Ok((canonical.to_string(), len))
        };
        let (time_dim, raw_len) = dim(&dims.time)?;
        let (lat_dim, n_lat) = dim(&dims.lat)?;
        let (lon_dim, n_lon) = dim(&dims.lon)?;
        let expected = [time_dim, lat_dim, lon_dim];

        let mut variables = Vec::with_capacity(self.profile.runoff_variables.len());
        for name in &self.profile.runoff_variables {
            let canonical = source
                .variables()
                .resolve(name)
                .ok_or_else(|| PrepError::data(format!("runoff file has no variable '{name}'")))?;
            let var_dims = source.variable_dims(canonical).unwrap_or_default();
            if var_dims != expected {
                return Err(PrepError::data(format!(
                    "variable '{canonical}' has dimensions {var_dims:?}, expected {expected:?}"
                )));
            }
            variables.push(canonical.to_string());
        }

        let times = self.time_values(source)?;
        let schedule = select_schedule(&self.profile, times.as_deref(), self.options.interval.as_deref())?;
        let steps = schedule.plan(raw_len, self.profile.accumulation)?;

        if let Some(r) = table
            .records()
            .iter()
            .find(|r| r.cell.lon >= n_lon || r.cell.lat >= n_lat)
        {
            return Err(PrepError::data(format!(
                "reach {} references grid point {} outside the {n_lon} x {n_lat} grid",
                r.reach_id, r.cell
            )));
        }
        let window = Window::covering(table.records().iter().map(|r| (r.cell.lon, r.cell.lat)))
            .ok_or_else(|| PrepError::config("weight table has no rows"))?;
        let offsets: Vec<usize> = table
            .records()
            .iter()
            .map(|r| window.offset(r.cell.lon, r.cell.lat))
            .collect();

        let mut runoff = Array2::<f64>::zeros((raw_len, window.len()));
        for name in &variables {
            let block = source.read_window(name, &window)?;
            let block = block
                .into_shape_with_order((raw_len, window.len()))
                .map_err(|e| PrepError::data(format!("variable '{name}': {e}")))?;
            runoff.scaled_add(self.profile.unit_scale, &block);
        }

        let inc = decumulate(runoff.view(), &steps, self.options.clamp_negative);
        if inc.negatives > 0 {
            tracing::warn!(
                negatives = inc.negatives,
                clamped = self.options.clamp_negative,
                "negative runoff increments"
            );
        }

        let records = table.records();
        let columns: Vec<Vec<f64>> = groups
            .par_iter()
            .map(|g| {
                let mut column = vec![0.0; steps.len()];
                for k in g.rows.clone() {
                    let area = records[k].area_sqm;
                    let series = inc.values.index_axis(Axis(1), offsets[k]);
                    for (c, &d) in column.iter_mut().zip(series) {
                        *c += area * d;
                    }
                }
                column
            })
            .collect();

        let mut volumes = Array2::zeros((steps.len(), groups.len()));
        for (mut dst, column) in volumes.axis_iter_mut(Axis(1)).zip(&columns) {
            for (d, &v) in dst.iter_mut().zip(column) {
                *d = v;
            }
        }

        tracing::info!(
            profile = %self.profile.name,
            interval = %schedule.interval,
            steps = steps.len(),
            reaches = groups.len(),
            window = ?window,
            "computed inflow"
        );
        Ok(InflowSeries {
            reach_field: table.reach_field().to_string(),
            reach_ids: groups.iter().map(|g| g.reach_id).collect(),
            volumes,
            interval: schedule.interval.clone(),
        })
    }

    /// Values of the profile's time coordinate, when the file carries it.
    fn time_values(&self, source: &dyn RunoffSource) -> PrepResult<Option<Vec<f64>>> {
        let Some(name) = &self.profile.coordinates.time else {
            return Ok(None);
        };
        let Some(canonical) = source.variables().resolve(name) else {
            tracing::debug!(coordinate = %name, "no time coordinate, schedule chosen by label");
            return Ok(None);
        };
        let values = source.read_coordinate(canonical)?;
        Ok(Some(values.iter().copied().collect()))
    }
}
