//! Weight table construction with cache reuse and inspection outputs.

use std::path::Path;

use rp_cache::{compute_weight_key, digest_bytes, CacheManifest, WeightKeyInput, WeightTableStore};
use rp_core::ReachId;
use rp_grid::{LsmGrid, NetcdfSource};
use rp_inflow::GridProfile;
use rp_project::IndexLabelsDef;
use rp_weights::{
    write_grid_cells_geojson, write_grid_points_geojson, CatchmentSet, IndexLabels, Tessellation,
    WeightOptions, WeightTable, WeightTableBuilder,
};

use crate::error::{AppError, AppResult};

const BUILDER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Request to build or reuse a weight table.
pub struct WeightRequest<'a> {
    pub catchments: &'a Path,
    pub id_field: &'a str,
    pub crs: Option<&'a str>,
    /// NetCDF file carrying the profile's coordinates.
    pub grid: &'a Path,
    pub profile: &'a GridProfile,
    pub options: WeightOptions,
    /// Keep the Thiessen cells for the grid point and cell GeoJSON outputs.
    pub inspect: bool,
    pub cache: Option<&'a WeightTableStore>,
}

#[derive(Debug)]
pub struct WeightResponse {
    pub table: WeightTable,
    pub key: Option<String>,
    pub loaded_from_cache: bool,
    /// Reaches given a zero-area row; unknown for cached tables.
    pub dummies: Option<usize>,
    /// Cells the table was built from, when inspection was requested.
    pub tessellation: Option<Tessellation>,
}

/// Write the grid point and cell GeoJSON of a table built with `inspect`.
pub fn write_inspection(response: &WeightResponse, points: &Path, cells: &Path) -> AppResult<()> {
    let tessellation = response.tessellation.as_ref().ok_or_else(|| {
        AppError::InvalidInput("weight table was built without inspection cells".to_string())
    })?;
    write_grid_points_geojson(tessellation, points)?;
    write_grid_cells_geojson(tessellation, cells)?;
    Ok(())
}

pub fn index_labels(def: IndexLabelsDef) -> IndexLabels {
    match def {
        IndexLabelsDef::LonLat => IndexLabels::LonLat,
        IndexLabelsDef::WestEastSouthNorth => IndexLabels::WestEastSouthNorth,
    }
}

/// Grid point lattice from the profile's coordinate variables.
pub fn load_grid(path: &Path, profile: &GridProfile) -> AppResult<LsmGrid> {
    let source = NetcdfSource::open(path)?;
    Ok(LsmGrid::from_source(
        &source,
        &profile.coordinates.lon,
        &profile.coordinates.lat,
        profile.longitude,
    )?)
}

fn flat_coordinates(grid: &LsmGrid) -> (Vec<f64>, Vec<f64>) {
    match grid {
        LsmGrid::Rectilinear { lon, lat } => (lon.clone(), lat.clone()),
        LsmGrid::Curvilinear { lon, lat } => (lon.iter().copied().collect(), lat.iter().copied().collect()),
    }
}

/// Build the weight table for `universe`, or load it from the cache when
/// the same inputs were seen before. Inspection outputs need the Thiessen
/// cells and therefore always rebuild.
pub fn ensure_weight_table(request: &WeightRequest, universe: &[ReachId]) -> AppResult<WeightResponse> {
    let bytes = std::fs::read(request.catchments).map_err(|e| AppError::InputFileRead {
        path: request.catchments.to_path_buf(),
        source: e,
    })?;
    let grid = load_grid(request.grid, request.profile)?;

    let key = request.cache.map(|_| {
        let (grid_lon, grid_lat) = flat_coordinates(&grid);
        compute_weight_key(
            &WeightKeyInput {
                reach_ids: universe.to_vec(),
                catchments_digest: digest_bytes(&bytes),
                catchment_id_field: request.id_field.to_string(),
                crs: request.crs.map(str::to_string),
                grid_lon,
                grid_lat,
                buffer_deg: request.options.buffer_deg,
                reach_field: request.options.reach_field.clone(),
                index_labels: format!("{:?}", request.options.labels),
            },
            BUILDER_VERSION,
        )
    });

    if let (Some(store), Some(key), false) = (request.cache, &key, request.inspect) {
        if store.contains(key) {
            let table = store.load(key)?;
            tracing::info!(key = %key, rows = table.len(), "weight table from cache");
            return Ok(WeightResponse {
                table,
                key: Some(key.clone()),
                loaded_from_cache: true,
                dummies: None,
                tessellation: None,
            });
        }
    }

    let content = String::from_utf8(bytes)
        .map_err(|e| AppError::InvalidInput(format!("catchment file is not UTF-8: {e}")))?;
    let catchments = CatchmentSet::parse_geojson(&content, request.id_field, request.crs)?;
    let build = WeightTableBuilder::new(request.options.clone()).build_with_cells(
        &catchments,
        &grid,
        universe,
    )?;

    if let (Some(store), Some(key)) = (request.cache, &key) {
        let manifest = CacheManifest::describe(key.clone(), &request.profile.name, &build.table, BUILDER_VERSION);
        store.save(&manifest, &build.table)?;
    }

    Ok(WeightResponse {
        table: build.table,
        key,
        loaded_from_cache: false,
        dummies: Some(build.dummies),
        tessellation: request.inspect.then_some(build.tessellation),
    })
}
