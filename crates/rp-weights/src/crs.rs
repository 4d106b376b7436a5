//! Coordinate reference systems accepted for catchment polygons.

use geojson::JsonObject;
use rp_core::constants::WEB_MERCATOR_RADIUS_M;
use rp_core::{PrepError, PrepResult};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    /// Longitude/latitude in degrees (EPSG:4326, OGC CRS84, NAD83, ETRS89).
    #[default]
    Geographic,
    /// Spherical Web Mercator in meters (EPSG:3857 and its aliases).
    WebMercator,
}

impl Crs {
    /// Parse an authority name such as `EPSG:4326`,
    /// `urn:ogc:def:crs:EPSG::3857` or `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn from_name(name: &str) -> PrepResult<Crs> {
        let upper = name.trim().to_ascii_uppercase();
        let code = upper.rsplit(':').next().unwrap_or_default();
        match code {
            "4326" | "CRS84" | "4269" | "4258" => Ok(Crs::Geographic),
            "3857" | "900913" | "3785" | "102100" | "102113" => Ok(Crs::WebMercator),
            _ => Err(PrepError::config(format!(
                "unsupported catchment CRS '{name}': only geographic (EPSG:4326) and \
                 Web Mercator (EPSG:3857) are accepted; reproject the catchments to \
                 EPSG:4326 first"
            ))),
        }
    }

    /// CRS named by the legacy GeoJSON `crs` member, if any.
    pub fn from_foreign_members(members: Option<&JsonObject>) -> PrepResult<Option<Crs>> {
        let Some(crs) = members.and_then(|m| m.get("crs")) else {
            return Ok(None);
        };
        let name = crs
            .get("properties")
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| PrepError::config("GeoJSON 'crs' member has no properties.name"))?;
        Crs::from_name(name).map(Some)
    }

    pub fn is_geographic(self) -> bool {
        self == Crs::Geographic
    }

    /// `(x, y)` in this CRS to `(lon, lat)` degrees.
    #[inline]
    pub fn to_geographic(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Crs::Geographic => (x, y),
            Crs::WebMercator => {
                let lon = (x / WEB_MERCATOR_RADIUS_M).to_degrees();
                let lat = (y / WEB_MERCATOR_RADIUS_M).sinh().atan().to_degrees();
                (lon, lat)
            }
        }
    }
}
