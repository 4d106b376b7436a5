//! Catchment polygons keyed by reach id.

use std::collections::HashMap;
use std::path::Path;

use geo::{BoundingRect, Coord, LineString, MapCoords, MultiPolygon, Polygon, Rect};
use geojson::{FeatureCollection, GeoJson};
use rp_core::{PrepError, PrepResult, ReachId};
use serde_json::Value;

use crate::crs::Crs;

#[derive(Debug, Clone, PartialEq)]
pub struct Catchment {
    pub reach_id: ReachId,
    pub geometry: MultiPolygon<f64>,
}

/// Catchments in one CRS, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct CatchmentSet {
    crs: Crs,
    catchments: Vec<Catchment>,
    index: HashMap<ReachId, usize>,
}

impl CatchmentSet {
    /// Features sharing a reach id are merged into one MultiPolygon.
    pub fn new<I>(crs: Crs, pieces: I) -> Self
    where
        I: IntoIterator<Item = (ReachId, MultiPolygon<f64>)>,
    {
        let mut set = CatchmentSet {
            crs,
            ..Default::default()
        };
        for (reach_id, geometry) in pieces {
            match set.index.get(&reach_id) {
                Some(&slot) => set.catchments[slot].geometry.0.extend(geometry.0),
                None => {
                    set.index.insert(reach_id, set.catchments.len());
                    set.catchments.push(Catchment { reach_id, geometry });
                }
            }
        }
        set
    }

    /// Read a GeoJSON FeatureCollection of Polygon/MultiPolygon features.
    ///
    /// `crs_override` wins over the file's legacy `crs` member; with neither
    /// the coordinates are taken as geographic.
    pub fn read_geojson(path: &Path, id_field: &str, crs_override: Option<&str>) -> PrepResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_geojson(&content, id_field, crs_override)
    }

    pub fn parse_geojson(content: &str, id_field: &str, crs_override: Option<&str>) -> PrepResult<Self> {
        let collection = parse_collection(content, "catchment")?;
        let crs = match crs_override {
            Some(name) => Crs::from_name(name)?,
            None => Crs::from_foreign_members(collection.foreign_members.as_ref())?.unwrap_or_default(),
        };

        let mut pieces = Vec::with_capacity(collection.features.len());
        let mut skipped = 0usize;
        for (i, feature) in collection.features.iter().enumerate() {
            let id = feature
                .properties
                .as_ref()
                .and_then(|props| property(props, id_field))
                .and_then(value_as_id)
                .ok_or_else(|| {
                    PrepError::data(format!(
                        "catchment feature {} has no integer '{id_field}' property",
                        i + 1
                    ))
                })?;
            let Some(geometry) = feature.geometry.as_ref() else {
                skipped += 1;
                continue;
            };
            let polygons = polygons_of(&geometry.value).ok_or_else(|| {
                PrepError::data(format!(
                    "catchment {id} has a {} geometry, expected Polygon or MultiPolygon",
                    geometry.value.type_name()
                ))
            })??;
            pieces.push((id, MultiPolygon::new(polygons)));
        }
        if skipped > 0 {
            tracing::warn!(skipped, "catchment features without geometry ignored");
        }

        let set = Self::new(crs, pieces);
        tracing::debug!(catchments = set.len(), crs = ?set.crs, "read catchments");
        Ok(set)
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.catchments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catchments.is_empty()
    }

    pub fn get(&self, reach_id: ReachId) -> Option<&Catchment> {
        self.index.get(&reach_id).map(|&slot| &self.catchments[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Catchment> {
        self.catchments.iter()
    }

    /// Same catchments in geographic coordinates.
    pub fn to_geographic(&self) -> CatchmentSet {
        if self.crs.is_geographic() {
            return self.clone();
        }
        let crs = self.crs;
        let project = move |c: Coord<f64>| {
            let (x, y) = crs.to_geographic(c.x, c.y);
            Coord { x, y }
        };
        CatchmentSet {
            crs: Crs::Geographic,
            catchments: self
                .catchments
                .iter()
                .map(|c| Catchment {
                    reach_id: c.reach_id,
                    geometry: c.geometry.map_coords(project),
                })
                .collect(),
            index: self.index.clone(),
        }
    }

    /// Bounding box of every catchment, `None` when there is no geometry.
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.catchments
            .iter()
            .filter_map(|c| c.geometry.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }
}

pub(crate) fn parse_collection(content: &str, what: &str) -> PrepResult<FeatureCollection> {
    let geojson: GeoJson = content
        .parse()
        .map_err(|e| PrepError::data(format!("invalid {what} GeoJSON: {e}")))?;
    FeatureCollection::try_from(geojson)
        .map_err(|e| PrepError::data(format!("{what} GeoJSON is not a FeatureCollection: {e}")))
}

/// Case-insensitive property lookup.
pub(crate) fn property<'a>(props: &'a geojson::JsonObject, name: &str) -> Option<&'a Value> {
    props
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

pub(crate) fn value_as_id(value: &Value) -> Option<ReachId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|v| v.fract() == 0.0 && v.is_finite())
                .map(|v| v as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Polygons of a Polygon/MultiPolygon value; `None` for other geometry types.
pub(crate) fn polygons_of(value: &geojson::Value) -> Option<PrepResult<Vec<Polygon<f64>>>> {
    match value {
        geojson::Value::Polygon(rings) => Some(polygon(rings).map(|p| vec![p])),
        geojson::Value::MultiPolygon(parts) => {
            Some(parts.iter().map(|rings| polygon(rings)).collect())
        }
        _ => None,
    }
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> PrepResult<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| ring(r));
    let exterior = rings
        .next()
        .ok_or_else(|| PrepError::data("polygon without an exterior ring"))??;
    let interiors = rings.collect::<PrepResult<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

pub(crate) fn ring(positions: &[Vec<f64>]) -> PrepResult<LineString<f64>> {
    positions
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            _ => Err(PrepError::data(format!("invalid position {p:?}"))),
        })
        .collect::<PrepResult<Vec<_>>>()
        .map(LineString::new)
}
