//! Per-reach inflow volumes and the routing model's inflow file.

use std::path::Path;

use ndarray::{Array2, ArrayView1, Axis};
use rp_core::{PrepError, PrepResult, ReachId};
use rp_grid::{attribute_text, GridError};

/// Name of the volume variable read by the routing model.
pub const INFLOW_VARIABLE: &str = "m3_riv";
/// Name of the time dimension of the inflow file.
pub const TIME_DIMENSION: &str = "Time";

/// `(time, reach)` lateral inflow in cubic meters per step.
#[derive(Debug, Clone, PartialEq)]
pub struct InflowSeries {
    /// Reach dimension name, taken verbatim from the weight table header.
    pub reach_field: String,
    /// Reach ids in weight-table order.
    pub reach_ids: Vec<ReachId>,
    pub volumes: Array2<f64>,
    /// Interval label of the schedule that produced the steps.
    pub interval: String,
}

impl InflowSeries {
    pub fn n_steps(&self) -> usize {
        self.volumes.nrows()
    }

    pub fn n_reaches(&self) -> usize {
        self.volumes.ncols()
    }

    /// Volumes of one reach over time.
    pub fn reach(&self, id: ReachId) -> Option<ArrayView1<'_, f64>> {
        let col = self.reach_ids.iter().position(|&r| r == id)?;
        Some(self.volumes.index_axis(Axis(1), col))
    }

    /// Write the inflow file: dimensions `Time` and the reach field, float
    /// `m3_riv(Time, reach)` in m3 and the int reach ids.
    pub fn write_netcdf(&self, path: &Path) -> PrepResult<()> {
        if self.reach_ids.len() != self.n_reaches() {
            return Err(PrepError::data(format!(
                "{} reach ids for {} volume columns",
                self.reach_ids.len(),
                self.n_reaches()
            )));
        }
        let ids = self
            .reach_ids
            .iter()
            .map(|&id| {
                i32::try_from(id).map_err(|_| {
                    PrepError::data(format!("reach id {id} does not fit a NetCDF int"))
                })
            })
            .collect::<PrepResult<Vec<i32>>>()?;

        let (steps, reaches) = (self.n_steps(), self.n_reaches());
        let volumes: Vec<f32> = self.volumes.iter().map(|&v| v as f32).collect();

        let reach_dim = self.reach_field.as_str();
        let mut file = netcdf::create(path).map_err(nc_error)?;
        file.add_unlimited_dimension(TIME_DIMENSION).map_err(nc_error)?;
        file.add_dimension(reach_dim, reaches).map_err(nc_error)?;
        file.add_attribute("Conventions", "CF-1.6").map_err(nc_error)?;
        file.add_attribute("title", "RAPID lateral inflow").map_err(nc_error)?;
        file.add_attribute("interval", self.interval.as_str()).map_err(nc_error)?;

        let mut rivid = file
            .add_variable::<i32>(reach_dim, &[reach_dim])
            .map_err(nc_error)?;
        rivid
            .put_attribute("long_name", "unique identifier for each river reach")
            .map_err(nc_error)?;
        rivid.put_values(&ids, ..).map_err(nc_error)?;

        let mut q = file
            .add_variable::<f32>(INFLOW_VARIABLE, &[TIME_DIMENSION, reach_dim])
            .map_err(nc_error)?;
        q.put_attribute("long_name", "accumulated inflow volume in river reach boundaries")
            .map_err(nc_error)?;
        q.put_attribute("units", "m3").map_err(nc_error)?;
        if steps > 0 {
            q.put_values(&volumes, vec![0..steps, 0..reaches].as_slice())
                .map_err(nc_error)?;
        }
        drop(file);

        tracing::info!(
            path = %path.display(),
            steps = self.n_steps(),
            reaches = self.n_reaches(),
            "wrote inflow file"
        );
        Ok(())
    }

    pub fn read_netcdf(path: &Path) -> PrepResult<Self> {
        let file = netcdf::open(path).map_err(nc_error)?;
        let var = file
            .variable(INFLOW_VARIABLE)
            .ok_or_else(|| PrepError::data(format!("{} has no {INFLOW_VARIABLE}", path.display())))?;
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let [time, reach_field] = dims.as_slice() else {
            return Err(PrepError::data(format!(
                "{INFLOW_VARIABLE} has dimensions {dims:?}, expected (time, reach)"
            )));
        };
        if !time.eq_ignore_ascii_case(TIME_DIMENSION) {
            return Err(PrepError::data(format!(
                "{INFLOW_VARIABLE} leads with '{time}', expected {TIME_DIMENSION}"
            )));
        }
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        let ids = file
            .variable(reach_field)
            .ok_or_else(|| PrepError::data(format!("no reach id variable {reach_field}")))?
            .get_values::<i64, _>(..)
            .map_err(nc_error)?;
        let volumes = var.get_values::<f64, _>(..).map_err(nc_error)?;
        let volumes = Array2::from_shape_vec((shape[0], shape[1]), volumes)
            .map_err(|e| PrepError::data(format!("{INFLOW_VARIABLE}: {e}")))?;
        let interval = attribute_text(file.attribute("interval")).unwrap_or_default();

        Ok(InflowSeries {
            reach_field: reach_field.clone(),
            reach_ids: ids,
            volumes,
            interval,
        })
    }
}

fn nc_error(err: netcdf::Error) -> PrepError {
    GridError::from(err).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn inflow_file_layout() {
        let series = InflowSeries {
            reach_field: "COMID".to_string(),
            reach_ids: vec![5, 7, 9],
            volumes: array![[50.0, 0.0, 1.5], [25.0, 0.0, 3.0]],
            interval: "3hr".to_string(),
        };
        let dir = std::env::temp_dir().join("rp_inflow_series");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("m3_riv.nc");
        series.write_netcdf(&path).unwrap();

        let file = netcdf::open(&path).unwrap();
        let var = file.variable("m3_riv").unwrap();
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        assert_eq!(dims, vec!["Time", "COMID"]);
        assert_eq!(attribute_text(var.attribute("units")).as_deref(), Some("m3"));
        assert!(file.dimension("Time").unwrap().is_unlimited());
        assert_eq!(file.variable("COMID").unwrap().get_values::<i32, _>(..).unwrap(), vec![5, 7, 9]);

        let back = InflowSeries::read_netcdf(&path).unwrap();
        assert_eq!(back, series);
        assert_eq!(back.reach(9).unwrap().to_vec(), vec![1.5, 3.0]);
    }

    #[test]
    fn rejects_ids_beyond_int() {
        let series = InflowSeries {
            reach_field: "rivid".to_string(),
            reach_ids: vec![i64::from(i32::MAX) + 1],
            volumes: Array2::zeros((1, 1)),
            interval: String::new(),
        };
        let path = std::env::temp_dir().join("rp_inflow_big_ids.nc");
        assert!(series.write_netcdf(&path).unwrap_err().is_data_validation());
    }
}
