//! Reaches whose drainage line crosses a reservoir polygon.

use std::collections::BTreeSet;
use std::path::Path;

use geo::{BoundingRect, Coord, Intersects, MapCoords, MultiLineString, Polygon};
use rp_core::{PrepError, PrepResult, ReachId};
use rstar::{RTree, RTreeObject, AABB};

use crate::catchment::{parse_collection, polygons_of, property, ring, value_as_id};
use crate::crs::Crs;

struct Reservoir {
    polygon: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for Reservoir {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

pub fn reservoir_reaches(
    drainage_path: &Path,
    id_field: &str,
    reservoir_path: &Path,
) -> PrepResult<BTreeSet<ReachId>> {
    let drainage = std::fs::read_to_string(drainage_path)?;
    let reservoirs = std::fs::read_to_string(reservoir_path)?;
    parse_reservoir_reaches(&drainage, id_field, &reservoirs)
}

/// Ids of drainage lines that intersect any reservoir polygon.
///
/// Both collections are brought to geographic coordinates first.
pub fn parse_reservoir_reaches(
    drainage: &str,
    id_field: &str,
    reservoirs: &str,
) -> PrepResult<BTreeSet<ReachId>> {
    let lakes = parse_collection(reservoirs, "reservoir")?;
    let lake_crs = Crs::from_foreign_members(lakes.foreign_members.as_ref())?.unwrap_or_default();
    let mut polygons = Vec::new();
    for feature in &lakes.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        if let Some(parts) = polygons_of(&geometry.value) {
            for polygon in parts? {
                let polygon = polygon.map_coords(move |c| geographic(lake_crs, c));
                if let Some(rect) = polygon.bounding_rect() {
                    polygons.push(Reservoir {
                        polygon,
                        envelope: AABB::from_corners(
                            [rect.min().x, rect.min().y],
                            [rect.max().x, rect.max().y],
                        ),
                    });
                }
            }
        }
    }
    let tree = RTree::bulk_load(polygons);

    let lines = parse_collection(drainage, "drainage")?;
    let line_crs = Crs::from_foreign_members(lines.foreign_members.as_ref())?.unwrap_or_default();
    let mut hits = BTreeSet::new();
    for (i, feature) in lines.features.iter().enumerate() {
        let id = feature
            .properties
            .as_ref()
            .and_then(|props| property(props, id_field))
            .and_then(value_as_id)
            .ok_or_else(|| {
                PrepError::data(format!(
                    "drainage feature {} has no integer '{id_field}' property",
                    i + 1
                ))
            })?;
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let line = match &geometry.value {
            geojson::Value::LineString(points) => MultiLineString::new(vec![ring(points)?]),
            geojson::Value::MultiLineString(parts) => {
                MultiLineString::new(parts.iter().map(|p| ring(p)).collect::<PrepResult<_>>()?)
            }
            other => {
                return Err(PrepError::data(format!(
                    "drainage feature {id} has a {} geometry, expected LineString",
                    other.type_name()
                )))
            }
        };
        let line = line.map_coords(move |c| geographic(line_crs, c));
        let Some(rect) = line.bounding_rect() else {
            continue;
        };
        let query = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        if tree
            .locate_in_envelope_intersecting(&query)
            .any(|r| r.polygon.intersects(&line))
        {
            hits.insert(id);
        }
    }
    tracing::info!(reaches = hits.len(), reservoirs = tree.size(), "flagged reservoir reaches");
    Ok(hits)
}

fn geographic(crs: Crs, c: Coord<f64>) -> Coord<f64> {
    let (x, y) = crs.to_geographic(c.x, c.y);
    Coord { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_crossing_lines() {
        let lakes = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]}}]}"#;
        let lines = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"HydroID": 1},
             "geometry": {"type": "LineString", "coordinates": [[-1,1],[1,1]]}},
            {"type": "Feature", "properties": {"HydroID": 2},
             "geometry": {"type": "LineString", "coordinates": [[3,3],[4,4]]}},
            {"type": "Feature", "properties": {"HydroID": 3},
             "geometry": {"type": "MultiLineString", "coordinates": [[[5,5],[6,6]],[[1.5,-1],[1.5,0.5]]]}}]}"#;
        let hits = parse_reservoir_reaches(lines, "hydroid", lakes).unwrap();
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }
}
