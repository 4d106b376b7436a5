//! Runoff sources.

use ndarray::{s, Array3, ArrayD, IxDyn};
use netcdf::AttributeValue;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::names::NameTable;
use crate::{GridError, GridResult};

/// Rectangular block of grid indices, half-open on both axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub lat: Range<usize>,
    pub lon: Range<usize>,
}

impl Window {
    pub fn n_lat(&self) -> usize {
        self.lat.len()
    }

    pub fn n_lon(&self) -> usize {
        self.lon.len()
    }

    pub fn len(&self) -> usize {
        self.n_lat() * self.n_lon()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest window holding every `(lon, lat)` pair.
    pub fn covering<I>(cells: I) -> Option<Window>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (lon, lat) in cells {
            bounds = Some(match bounds {
                None => (lon, lon, lat, lat),
                Some((x0, x1, y0, y1)) => (x0.min(lon), x1.max(lon), y0.min(lat), y1.max(lat)),
            });
        }
        bounds.map(|(x0, x1, y0, y1)| Window {
            lat: y0..y1 + 1,
            lon: x0..x1 + 1,
        })
    }

    /// Row-major offset of `(lon, lat)` inside the window.
    #[inline]
    pub fn offset(&self, lon: usize, lat: usize) -> usize {
        (lat - self.lat.start) * self.n_lon() + (lon - self.lon.start)
    }
}

/// Gridded runoff data with named dimensions and variables.
///
/// Names passed to the accessors are canonical (as stored); resolve
/// user-facing names through [`RunoffSource::dimensions`] and
/// [`RunoffSource::variables`] first.
pub trait RunoffSource {
    fn dimensions(&self) -> &NameTable;

    fn variables(&self) -> &NameTable;

    fn dimension_len(&self, name: &str) -> Option<usize>;

    /// Dimension names of a variable, slowest varying first.
    fn variable_dims(&self, name: &str) -> Option<Vec<String>>;

    /// Whole coordinate variable as f64.
    fn read_coordinate(&self, name: &str) -> GridResult<ArrayD<f64>>;

    /// `(time, lat, lon)` values of a 3-D variable restricted to `window`,
    /// all time steps. Packed values are unpacked and fill values become 0.
    fn read_window(&self, name: &str, window: &Window) -> GridResult<Array3<f64>>;
}

/// Runoff source backed by a NetCDF file (classic, 64-bit offset or
/// NetCDF-4), read through libnetcdf.
pub struct NetcdfSource {
    path: PathBuf,
    file: netcdf::File,
    dimensions: NameTable,
    variables: NameTable,
}

impl std::fmt::Debug for NetcdfSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetcdfSource")
            .field("path", &self.path)
            .field("dimensions", &self.dimensions)
            .field("variables", &self.variables)
            .finish()
    }
}

impl NetcdfSource {
    pub fn open(path: &Path) -> GridResult<Self> {
        if !path.exists() {
            return Err(GridError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }
        let file = netcdf::open(path)?;
        let dimensions = NameTable::new(file.dimensions().map(|d| d.name()));
        let variables = NameTable::new(file.variables().map(|v| v.name()));
        tracing::debug!(
            path = %path.display(),
            dimensions = dimensions.len(),
            variables = variables.len(),
            "opened runoff file"
        );
        Ok(Self {
            path: path.to_path_buf(),
            file,
            dimensions,
            variables,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn variable(&self, name: &str) -> GridResult<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| GridError::MissingVariable {
                name: name.to_string(),
            })
    }
}

/// Numeric attribute value; the first element of an array attribute.
pub fn attribute_f64(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        AttributeValue::Schar(v) => Some(f64::from(v)),
        AttributeValue::Uchar(v) => Some(f64::from(v)),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Floats(v) => v.first().map(|&x| f64::from(x)),
        AttributeValue::Ints(v) => v.first().map(|&x| f64::from(x)),
        AttributeValue::Shorts(v) => v.first().map(|&x| f64::from(x)),
        _ => None,
    }
}

/// Text attribute value.
pub fn attribute_text(attr: Option<netcdf::Attribute<'_>>) -> Option<String> {
    match attr?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Apply `_FillValue`/`missing_value` and `scale_factor`/`add_offset`.
///
/// Returns the unpacked values and the number of fill values replaced.
fn unpack(mut values: Vec<f64>, var: &netcdf::Variable<'_>, fill_as: f64) -> (Vec<f64>, usize) {
    let fills: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|a| attribute_f64(var, a))
        .collect();
    let scale = attribute_f64(var, "scale_factor").unwrap_or(1.0);
    let offset = attribute_f64(var, "add_offset").unwrap_or(0.0);

    let mut filled = 0;
    for v in values.iter_mut() {
        let raw = *v;
        if raw.is_nan() || fills.iter().any(|&f| f == raw) {
            *v = fill_as;
            filled += 1;
        } else {
            *v = raw * scale + offset;
        }
    }
    (values, filled)
}

impl RunoffSource for NetcdfSource {
    fn dimensions(&self) -> &NameTable {
        &self.dimensions
    }

    fn variables(&self) -> &NameTable {
        &self.variables
    }

    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.file.dimension(name).map(|d| d.len())
    }

    fn variable_dims(&self, name: &str) -> Option<Vec<String>> {
        let var = self.file.variable(name)?;
        Some(var.dimensions().iter().map(|d| d.name()).collect())
    }

    fn read_coordinate(&self, name: &str) -> GridResult<ArrayD<f64>> {
        let var = self.variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let values = var.get_values::<f64, _>(..)?;
        let (values, _) = unpack(values, &var, f64::NAN);
        ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| GridError::Shape {
            name: name.to_string(),
            what: e.to_string(),
        })
    }

    fn read_window(&self, name: &str, window: &Window) -> GridResult<Array3<f64>> {
        let var = self.variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let &[n_time, n_lat, n_lon] = shape.as_slice() else {
            return Err(GridError::Shape {
                name: name.to_string(),
                what: format!("expected (time, lat, lon), found rank {}", shape.len()),
            });
        };
        if window.lat.end > n_lat || window.lon.end > n_lon {
            return Err(GridError::OutOfRange {
                name: name.to_string(),
                what: format!("window {:?} outside shape {:?}", window, shape),
            });
        }
        let extents = vec![0..n_time, window.lat.clone(), window.lon.clone()];
        let values = var.get_values::<f64, _>(extents.as_slice())?;
        let (values, filled) = unpack(values, &var, 0.0);
        if filled > 0 {
            tracing::warn!(variable = name, filled, "fill values in runoff window read as 0");
        }
        Array3::from_shape_vec((n_time, window.n_lat(), window.n_lon()), values).map_err(|e| {
            GridError::Shape {
                name: name.to_string(),
                what: e.to_string(),
            }
        })
    }
}

/// In-memory runoff source, mainly for tests and synthetic grids.
#[derive(Debug, Clone, Default)]
pub struct MemoryRunoffSource {
    dims: Vec<(String, usize)>,
    vars: Vec<(String, Vec<String>, ArrayD<f64>)>,
    dimensions: NameTable,
    variables: NameTable,
}

impl MemoryRunoffSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(mut self, name: &str, len: usize) -> Self {
        self.dims.push((name.to_string(), len));
        self.dimensions = NameTable::new(self.dims.iter().map(|(n, _)| n.as_str()));
        self
    }

    /// Add a variable; its shape must match the named dimensions.
    pub fn with_variable(
        mut self,
        name: &str,
        dims: &[&str],
        data: ArrayD<f64>,
    ) -> GridResult<Self> {
        let mut expected = Vec::with_capacity(dims.len());
        for d in dims {
            let len = self
                .dims
                .iter()
                .find(|(n, _)| n == d)
                .map(|(_, l)| *l)
                .ok_or_else(|| GridError::MissingDimension {
                    name: d.to_string(),
                })?;
            expected.push(len);
        }
        if data.shape() != expected.as_slice() {
            return Err(GridError::Shape {
                name: name.to_string(),
                what: format!("data shape {:?}, dimensions {:?}", data.shape(), expected),
            });
        }
        self.vars.push((
            name.to_string(),
            dims.iter().map(|d| d.to_string()).collect(),
            data,
        ));
        self.variables = NameTable::new(self.vars.iter().map(|(n, _, _)| n.as_str()));
        Ok(self)
    }

    fn get(&self, name: &str) -> GridResult<&(String, Vec<String>, ArrayD<f64>)> {
        self.vars
            .iter()
            .find(|(n, _, _)| n == name)
            .ok_or_else(|| GridError::MissingVariable {
                name: name.to_string(),
            })
    }
}

impl RunoffSource for MemoryRunoffSource {
    fn dimensions(&self) -> &NameTable {
        &self.dimensions
    }

    fn variables(&self) -> &NameTable {
        &self.variables
    }

    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.dims.iter().find(|(n, _)| n == name).map(|(_, l)| *l)
    }

    fn variable_dims(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).ok().map(|(_, d, _)| d.clone())
    }

    fn read_coordinate(&self, name: &str) -> GridResult<ArrayD<f64>> {
        Ok(self.get(name)?.2.clone())
    }

    fn read_window(&self, name: &str, window: &Window) -> GridResult<Array3<f64>> {
        let (_, _, data) = self.get(name)?;
        if data.ndim() != 3 {
            return Err(GridError::Shape {
                name: name.to_string(),
                what: format!("expected (time, lat, lon), found rank {}", data.ndim()),
            });
        }
        let shape = data.shape();
        if window.lat.end > shape[1] || window.lon.end > shape[2] {
            return Err(GridError::OutOfRange {
                name: name.to_string(),
                what: format!("window {:?} outside shape {:?}", window, shape),
            });
        }
        let block = data.slice(s![.., window.lat.clone(), window.lon.clone()]);
        Ok(block.to_owned().into_dimensionality().map_err(|e| GridError::Shape {
            name: name.to_string(),
            what: e.to_string(),
        })?)
    }
}
