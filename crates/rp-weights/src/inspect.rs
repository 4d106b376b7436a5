//! GeoJSON dumps of the grid points and Thiessen cells behind a weight table.

use std::path::Path;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use rp_core::PrepResult;

use crate::thiessen::{GridCell, Tessellation};

fn properties(cell: &GridCell) -> JsonObject {
    let mut props = JsonObject::new();
    props.insert("lon_index".to_string(), cell.cell.lon.into());
    props.insert("lat_index".to_string(), cell.cell.lat.into());
    props.insert("lon".to_string(), cell.lon.into());
    props.insert("lat".to_string(), cell.lat.into());
    props
}

fn write_features(path: &Path, features: Vec<Feature>) -> PrepResult<()> {
    let count = features.len();
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    std::fs::write(path, GeoJson::from(collection).to_string())?;
    tracing::info!(path = %path.display(), features = count, "wrote grid inspection file");
    Ok(())
}

/// One Point feature per selected grid point.
pub fn write_grid_points_geojson(tessellation: &Tessellation, path: &Path) -> PrepResult<()> {
    let features = tessellation
        .cells()
        .iter()
        .map(|cell| Feature {
            geometry: Some(Geometry::new(Value::Point(vec![cell.lon, cell.lat]))),
            properties: Some(properties(cell)),
            ..Default::default()
        })
        .collect();
    write_features(path, features)
}

/// One Polygon feature per Thiessen cell.
pub fn write_grid_cells_geojson(tessellation: &Tessellation, path: &Path) -> PrepResult<()> {
    let features = tessellation
        .cells()
        .iter()
        .map(|cell| Feature {
            geometry: Some(Geometry::new(Value::from(&cell.polygon))),
            properties: Some(properties(cell)),
            ..Default::default()
        })
        .collect();
    write_features(path, features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rp_grid::{LonConvention, LsmGrid};

    #[test]
    fn writes_points_and_cells() {
        let grid = LsmGrid::rectilinear(vec![0.0, 1.0], vec![0.0, 1.0], LonConvention::Signed).unwrap();
        let points = grid.points_within(-1.0, 2.0, -1.0, 2.0);
        let tess = Tessellation::new(&grid, &points);

        let dir = std::env::temp_dir().join("rp_weights_inspect");
        std::fs::create_dir_all(&dir).unwrap();
        let points_path = dir.join("points.geojson");
        let cells_path = dir.join("cells.geojson");
        write_grid_points_geojson(&tess, &points_path).unwrap();
        write_grid_cells_geojson(&tess, &cells_path).unwrap();

        let text = std::fs::read_to_string(&points_path).unwrap();
        let fc = FeatureCollection::try_from(text.parse::<GeoJson>().unwrap()).unwrap();
        assert_eq!(fc.features.len(), 4);
        assert_eq!(
            fc.features[3].properties.as_ref().unwrap()["lon_index"],
            serde_json::json!(1)
        );

        let text = std::fs::read_to_string(&cells_path).unwrap();
        assert!(text.contains("\"Polygon\""));
    }
}
