//! LSM grid point coordinates.

use ndarray::{Array2, ArrayD, Axis, Ix1, Ix2};
use rp_core::{ensure_finite, nearest_index, wrap_longitude, CellIndex, PrepError, PrepResult};
use serde::{Deserialize, Serialize};

use crate::source::RunoffSource;

/// How stored longitudes are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LonConvention {
    /// Normalize to `[-180, 180)`.
    #[default]
    Signed,
    /// Keep the values stored in the file.
    AsStored,
}

impl LonConvention {
    #[inline]
    pub fn apply(self, lon: f64) -> f64 {
        match self {
            LonConvention::Signed => wrap_longitude(lon),
            LonConvention::AsStored => lon,
        }
    }
}

/// Lattice of grid point centers.
///
/// Rectilinear grids carry 1-D axes; curvilinear grids carry 2-D arrays
/// shaped `[lat, lon]` (south_north, west_east).
#[derive(Debug, Clone, PartialEq)]
pub enum LsmGrid {
    Rectilinear { lon: Vec<f64>, lat: Vec<f64> },
    Curvilinear { lon: Array2<f64>, lat: Array2<f64> },
}

impl LsmGrid {
    pub fn rectilinear(
        lon: Vec<f64>,
        lat: Vec<f64>,
        convention: LonConvention,
    ) -> PrepResult<Self> {
        if lon.len() < 2 || lat.len() < 2 {
            return Err(PrepError::config(format!(
                "grid needs at least 2 points per axis, got {} x {}",
                lon.len(),
                lat.len()
            )));
        }
        for &v in lon.iter().chain(&lat) {
            ensure_finite(v, "grid coordinate")?;
        }
        let lon = lon.into_iter().map(|v| convention.apply(v)).collect();
        Ok(LsmGrid::Rectilinear { lon, lat })
    }

    pub fn curvilinear(
        lon: Array2<f64>,
        lat: Array2<f64>,
        convention: LonConvention,
    ) -> PrepResult<Self> {
        if lon.dim() != lat.dim() {
            return Err(PrepError::config(format!(
                "longitude shape {:?} differs from latitude shape {:?}",
                lon.dim(),
                lat.dim()
            )));
        }
        let (ny, nx) = lon.dim();
        if ny < 2 || nx < 2 {
            return Err(PrepError::config(format!(
                "grid needs at least 2 points per axis, got {nx} x {ny}"
            )));
        }
        for &v in lon.iter().chain(lat.iter()) {
            ensure_finite(v, "grid coordinate")?;
        }
        let lon = lon.mapv(|v| convention.apply(v));
        Ok(LsmGrid::Curvilinear { lon, lat })
    }

    /// Build from coordinate arrays of any supported rank.
    ///
    /// 1-D pairs give a rectilinear grid, 2-D pairs a curvilinear one; 3-D
    /// arrays (time-stamped geogrid coordinates) use their first slice.
    pub fn from_coordinates(
        lon: ArrayD<f64>,
        lat: ArrayD<f64>,
        convention: LonConvention,
    ) -> PrepResult<Self> {
        let squeeze = |a: ArrayD<f64>| -> ArrayD<f64> {
            if a.ndim() == 3 {
                a.index_axis(Axis(0), 0).to_owned()
            } else {
                a
            }
        };
        let (lon, lat) = (squeeze(lon), squeeze(lat));
        match (lon.ndim(), lat.ndim()) {
            (1, 1) => {
                let lon = lon
                    .into_dimensionality::<Ix1>()
                    .map_err(|e| PrepError::config(e.to_string()))?;
                let lat = lat
                    .into_dimensionality::<Ix1>()
                    .map_err(|e| PrepError::config(e.to_string()))?;
                Self::rectilinear(lon.to_vec(), lat.to_vec(), convention)
            }
            (2, 2) => {
                let lon = lon
                    .into_dimensionality::<Ix2>()
                    .map_err(|e| PrepError::config(e.to_string()))?;
                let lat = lat
                    .into_dimensionality::<Ix2>()
                    .map_err(|e| PrepError::config(e.to_string()))?;
                Self::curvilinear(lon, lat, convention)
            }
            (a, b) => Err(PrepError::config(format!(
                "unsupported coordinate ranks: longitude {a}-D, latitude {b}-D"
            ))),
        }
    }

    /// Read coordinates named `lon_var`/`lat_var` (any case) from a source.
    pub fn from_source(
        source: &dyn RunoffSource,
        lon_var: &str,
        lat_var: &str,
        convention: LonConvention,
    ) -> PrepResult<Self> {
        let resolve = |name: &str| {
            source.variables().resolve(name).map(str::to_string).ok_or_else(|| {
                PrepError::data(format!("grid file has no coordinate variable '{name}'"))
            })
        };
        let lon = source.read_coordinate(&resolve(lon_var)?)?;
        let lat = source.read_coordinate(&resolve(lat_var)?)?;
        Self::from_coordinates(lon, lat, convention)
    }

    pub fn is_rectilinear(&self) -> bool {
        matches!(self, LsmGrid::Rectilinear { .. })
    }

    pub fn n_lon(&self) -> usize {
        match self {
            LsmGrid::Rectilinear { lon, .. } => lon.len(),
            LsmGrid::Curvilinear { lon, .. } => lon.ncols(),
        }
    }

    pub fn n_lat(&self) -> usize {
        match self {
            LsmGrid::Rectilinear { lat, .. } => lat.len(),
            LsmGrid::Curvilinear { lon, .. } => lon.nrows(),
        }
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        cell.lon < self.n_lon() && cell.lat < self.n_lat()
    }

    /// `(lon, lat)` of a grid point.
    pub fn point(&self, cell: CellIndex) -> (f64, f64) {
        match self {
            LsmGrid::Rectilinear { lon, lat } => (lon[cell.lon], lat[cell.lat]),
            LsmGrid::Curvilinear { lon, lat } => {
                (lon[[cell.lat, cell.lon]], lat[[cell.lat, cell.lon]])
            }
        }
    }

    /// Largest spacing between neighboring points, in degrees.
    pub fn max_spacing(&self) -> f64 {
        let dlon = |a: f64, b: f64| wrap_longitude(b - a).abs();
        let dlat = |a: f64, b: f64| (b - a).abs();
        match self {
            LsmGrid::Rectilinear { lon, lat } => {
                let lon_max = lon.windows(2).map(|w| dlon(w[0], w[1])).fold(0.0, f64::max);
                let lat_max = lat.windows(2).map(|w| dlat(w[0], w[1])).fold(0.0, f64::max);
                lon_max.max(lat_max)
            }
            LsmGrid::Curvilinear { lon, lat } => {
                let (ny, nx) = lon.dim();
                let mut best: f64 = 0.0;
                for j in 0..ny {
                    for i in 0..nx {
                        if i + 1 < nx {
                            best = best
                                .max(dlon(lon[[j, i]], lon[[j, i + 1]]))
                                .max(dlat(lat[[j, i]], lat[[j, i + 1]]));
                        }
                        if j + 1 < ny {
                            best = best
                                .max(dlon(lon[[j, i]], lon[[j + 1, i]]))
                                .max(dlat(lat[[j, i]], lat[[j + 1, i]]));
                        }
                    }
                }
                best
            }
        }
    }

    /// Grid point nearest to `(lon, lat)`.
    pub fn locate(&self, lon: f64, lat: f64) -> PrepResult<CellIndex> {
        match self {
            LsmGrid::Rectilinear { lon: xs, lat: ys } => {
                let i = nearest_index(xs, lon)?;
                let j = nearest_index(ys, lat)?;
                Ok(CellIndex::new(i, j))
            }
            LsmGrid::Curvilinear { lon: xs, lat: ys } => {
                if !lon.is_finite() || !lat.is_finite() {
                    return Err(PrepError::index(format!(
                        "cannot locate non-finite point ({lon}, {lat})"
                    )));
                }
                let mut best: Option<(CellIndex, f64)> = None;
                for ((j, i), &x) in xs.indexed_iter() {
                    let dx = wrap_longitude(x - lon);
                    let dy = ys[[j, i]] - lat;
                    let d = dx * dx + dy * dy;
                    if best.map_or(true, |(_, bd)| d < bd) {
                        best = Some((CellIndex::new(i, j), d));
                    }
                }
                best.map(|(c, _)| c)
                    .ok_or_else(|| PrepError::index("empty curvilinear grid"))
            }
        }
    }

    /// Every grid point inside the box `[min_lon, max_lon] x [min_lat, max_lat]`,
    /// row-major order.
    pub fn points_within(
        &self,
        min_lon: f64,
        max_lon: f64,
        min_lat: f64,
        max_lat: f64,
    ) -> Vec<CellIndex> {
        let inside =
            |x: f64, y: f64| x >= min_lon && x <= max_lon && y >= min_lat && y <= max_lat;
        match self {
            LsmGrid::Rectilinear { lon, lat } => {
                let mut out = Vec::new();
                for (j, &y) in lat.iter().enumerate() {
                    for (i, &x) in lon.iter().enumerate() {
                        if inside(x, y) {
                            out.push(CellIndex::new(i, j));
                        }
                    }
                }
                out
            }
            LsmGrid::Curvilinear { lon, lat } => lon
                .indexed_iter()
                .filter(|&((j, i), &x)| inside(x, lat[[j, i]]))
                .map(|((j, i), _)| CellIndex::new(i, j))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn normalizes_longitudes() {
        let grid =
            LsmGrid::rectilinear(vec![0.0, 90.0, 180.0, 270.0], vec![10.0, 0.0], LonConvention::Signed)
                .unwrap();
        assert_eq!(grid.point(CellIndex::new(3, 0)), (-90.0, 10.0));
        assert_eq!(grid.point(CellIndex::new(2, 1)), (-180.0, 0.0));
        assert_eq!(grid.max_spacing(), 90.0);
    }

    #[test]
    fn rejects_degenerate_axes() {
        let err = LsmGrid::rectilinear(vec![1.0], vec![1.0, 2.0], LonConvention::Signed).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn locate_uses_nearest_value() {
        let grid = LsmGrid::rectilinear(
            vec![-0.25, -1e-12, 0.25],
            vec![0.25, 1e-12, -0.25],
            LonConvention::Signed,
        )
        .unwrap();
        assert_eq!(grid.locate(0.0, 0.0).unwrap(), CellIndex::new(1, 1));
        assert_eq!(grid.locate(0.3, -0.2).unwrap(), CellIndex::new(2, 2));
    }

    #[test]
    fn curvilinear_locate_and_window() {
        let lon = array![[10.0, 11.0, 12.0], [10.1, 11.1, 12.1]];
        let lat = array![[40.0, 40.1, 40.2], [41.0, 41.1, 41.2]];
        let grid = LsmGrid::curvilinear(lon, lat, LonConvention::Signed).unwrap();
        assert_eq!(grid.n_lon(), 3);
        assert_eq!(grid.n_lat(), 2);
        assert_eq!(grid.locate(11.05, 40.9).unwrap(), CellIndex::new(1, 1));
        let pts = grid.points_within(10.5, 12.5, 39.0, 40.5);
        assert_eq!(pts, vec![CellIndex::new(1, 0), CellIndex::new(2, 0)]);
    }

    #[test]
    fn three_d_coordinates_use_first_slice() {
        let lon = ndarray::Array3::from_shape_fn((2, 2, 3), |(t, _, i)| i as f64 + t as f64 * 100.0)
            .into_dyn();
        let lat = ndarray::Array3::from_shape_fn((2, 2, 3), |(_, j, _)| j as f64).into_dyn();
        let grid = LsmGrid::from_coordinates(lon, lat, LonConvention::AsStored).unwrap();
        assert!(!grid.is_rectilinear());
        assert_eq!(grid.point(CellIndex::new(2, 1)), (2.0, 1.0));
    }
}
