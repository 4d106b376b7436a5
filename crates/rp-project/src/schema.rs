//! Pipeline and profile catalog schema definitions.

use std::path::{Path, PathBuf};

use rp_inflow::GridProfile;
use rp_muskingum::MuskingumOptions;
use serde::{Deserialize, Serialize};

/// Versioned list of grid profiles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileCatalog {
    pub version: u32,
    #[serde(default)]
    pub profiles: Vec<ProfileEntry>,
}

/// One catalog profile plus fields only older catalog versions carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileEntry {
    #[serde(flatten)]
    pub profile: GridProfile,
    /// Version 1 spelling of `accumulation`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decumulate: Option<bool>,
}

impl From<GridProfile> for ProfileEntry {
    fn from(profile: GridProfile) -> Self {
        Self {
            profile,
            decumulate: None,
        }
    }
}

impl ProfileCatalog {
    /// Profile by name, any case.
    pub fn profile(&self, name: &str) -> Option<&GridProfile> {
        self.profiles
            .iter()
            .map(|e| &e.profile)
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|e| e.profile.name.as_str()).collect()
    }

    /// Add `other`'s profiles, replacing same-named ones.
    pub fn merge(&mut self, other: ProfileCatalog) {
        for entry in other.profiles {
            match self
                .profiles
                .iter_mut()
                .find(|e| e.profile.name.eq_ignore_ascii_case(&entry.profile.name))
            {
                Some(existing) => *existing = entry,
                None => self.profiles.push(entry),
            }
        }
    }
}

/// Everything one end-to-end run needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    pub version: u32,
    pub name: String,
    /// Grid profile name, looked up in the built-in and user catalogs.
    pub profile: String,
    /// Extra profile catalog merged over the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<PathBuf>,
    pub network: NetworkDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<WeightsDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflow: Option<InflowDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muskingum: Option<MuskingumDef>,
    #[serde(default)]
    pub outputs: OutputsDef,
    /// Weight table cache directory; no caching when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkSourceDef {
    #[default]
    NextDown,
    NodeTopology,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkDef {
    /// Drainage lines: GeoJSON or a delimited table with a header row.
    pub drainage: PathBuf,
    #[serde(default)]
    pub link_source: LinkSourceDef,
    #[serde(default)]
    pub fields: DrainageFieldsDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upstream: Option<usize>,
    #[serde(default)]
    pub outlet_sentinel: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DrainageFieldsDef {
    pub reach_id: String,
    pub next_down: String,
    pub from_node: String,
    pub to_node: String,
    pub divergence: String,
    pub length: String,
    pub slope: String,
}

impl Default for DrainageFieldsDef {
    fn default() -> Self {
        Self {
            reach_id: "HydroID".to_string(),
            next_down: "NextDownID".to_string(),
            from_node: "FromNode".to_string(),
            to_node: "ToNode".to_string(),
            divergence: "Divergence".to_string(),
            length: "LengthKm".to_string(),
            slope: "Slope".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexLabelsDef {
    #[default]
    LonLat,
    WestEastSouthNorth,
}

fn default_reach_field() -> String {
    "rivid".to_string()
}

fn default_catchment_id() -> String {
    "HydroID".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightsDef {
    /// Catchment polygons (GeoJSON).
    pub catchments: PathBuf,
    #[serde(default = "default_catchment_id")]
    pub catchment_id_field: String,
    /// Overrides the CRS declared in the catchment file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// NetCDF file carrying the profile's grid coordinates.
    pub grid: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_deg: Option<f64>,
    #[serde(default = "default_reach_field")]
    pub reach_field: String,
    #[serde(default)]
    pub index_labels: IndexLabelsDef,
    /// Also write the selected grid points and their cells as GeoJSON.
    #[serde(default)]
    pub inspect: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InflowDef {
    pub runoff: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default)]
    pub clamp_negative: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MuskingumDef {
    #[serde(default)]
    pub options: MuskingumOptions,
    /// Reservoir polygons (GeoJSON); reaches crossing them get x = 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservoirs: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputsDef {
    pub dir: PathBuf,
    pub connectivity: String,
    pub basin_ids: String,
    pub weight_table: String,
    pub inflow: String,
    pub kfac: String,
    pub k: String,
    pub x: String,
    pub grid_points: String,
    pub grid_cells: String,
}

impl Default for OutputsDef {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            connectivity: "rapid_connect.csv".to_string(),
            basin_ids: "riv_bas_id.csv".to_string(),
            weight_table: "weight_table.csv".to_string(),
            inflow: "m3_riv.nc".to_string(),
            kfac: "kfac.csv".to_string(),
            k: "k.csv".to_string(),
            x: "x.csv".to_string(),
            grid_points: "grid_points.geojson".to_string(),
            grid_cells: "grid_cells.geojson".to_string(),
        }
    }
}

impl OutputsDef {
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

impl PipelineConfig {
    /// Resolve relative input and output paths against `base`, the
    /// directory of the pipeline file.
    pub fn rebase(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.network.drainage);
        if let Some(p) = self.profiles.as_mut() {
            fix(p);
        }
        if let Some(w) = self.weights.as_mut() {
            fix(&mut w.catchments);
            fix(&mut w.grid);
        }
        if let Some(i) = self.inflow.as_mut() {
            fix(&mut i.runoff);
        }
        if let Some(r) = self.muskingum.as_mut().and_then(|m| m.reservoirs.as_mut()) {
            fix(r);
        }
        if let Some(c) = self.cache_dir.as_mut() {
            fix(c);
        }
        fix(&mut self.outputs.dir);
    }
}
