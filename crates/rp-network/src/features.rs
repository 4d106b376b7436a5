//! Drainage-line attribute readers.

use geojson::{FeatureCollection, GeoJson};
use rp_core::{PrepError, PrepResult, ReachId};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use crate::error::NetworkError;

/// Attribute names of the drainage-line features. Matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainageFields {
    pub reach_id: String,
    pub next_down: String,
    pub from_node: String,
    pub to_node: String,
    pub divergence: String,
    pub length: String,
    pub slope: String,
}

impl Default for DrainageFields {
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

/// Attributes of one drainage line. Only the id is mandatory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrainageRecord {
    pub id: ReachId,
    pub next_down: Option<i64>,
    pub from_node: Option<i64>,
    pub to_node: Option<i64>,
    pub divergence: Option<i64>,
    pub length: Option<f64>,
    pub slope: Option<f64>,
}

/// Read drainage attributes from a comma-delimited file with a header row.
pub fn read_drainage_csv(path: &Path, fields: &DrainageFields) -> PrepResult<Vec<DrainageRecord>> {
    let content = std::fs::read_to_string(path)?;
    parse_drainage_csv(&content, fields)
}

pub fn parse_drainage_csv(content: &str, fields: &DrainageFields) -> PrepResult<Vec<DrainageRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_ascii_lowercase(), i))
        .collect();
    if columns.is_empty() {
        return Err(PrepError::data("drainage table is empty"));
    }
    let col = |name: &str| columns.get(&name.to_ascii_lowercase()).copied();
    let id_col = col(&fields.reach_id).ok_or_else(|| NetworkError::MissingField {
        field: fields.reach_id.clone(),
    })?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        let line = row.position().map_or(0, |p| p.line() as usize);
        let cell = |c: Option<usize>| c.and_then(|i| row.get(i));

        let id = parse_int(cell(Some(id_col)), line, &fields.reach_id)?.ok_or_else(|| {
            NetworkError::MalformedRow {
                line,
                what: format!("missing {}", fields.reach_id),
            }
        })?;

        records.push(DrainageRecord {
            id,
            next_down: parse_int(cell(col(&fields.next_down)), line, &fields.next_down)?,
            from_node: parse_int(cell(col(&fields.from_node)), line, &fields.from_node)?,
            to_node: parse_int(cell(col(&fields.to_node)), line, &fields.to_node)?,
            divergence: parse_int(cell(col(&fields.divergence)), line, &fields.divergence)?,
            length: parse_float(cell(col(&fields.length)), line, &fields.length)?,
            slope: parse_float(cell(col(&fields.slope)), line, &fields.slope)?,
        });
    }

    tracing::debug!(records = records.len(), "read drainage table");
    Ok(records)
}

/// Read drainage attributes from the properties of a GeoJSON FeatureCollection.
pub fn read_drainage_geojson(
    path: &Path,
    fields: &DrainageFields,
) -> PrepResult<Vec<DrainageRecord>> {
    let content = std::fs::read_to_string(path)?;
    parse_drainage_geojson(&content, fields)
}

pub fn parse_drainage_geojson(
    content: &str,
    fields: &DrainageFields,
) -> PrepResult<Vec<DrainageRecord>> {
    let geojson: GeoJson = content
        .parse()
        .map_err(|e| PrepError::data(format!("invalid drainage GeoJSON: {e}")))?;
    let collection = FeatureCollection::try_from(geojson)
        .map_err(|e| PrepError::data(format!("drainage GeoJSON is not a FeatureCollection: {e}")))?;

    let mut records = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.iter().enumerate() {
        let line = i + 1;
        let props: HashMap<String, &Value> = feature
            .properties
            .iter()
            .flatten()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        let get = |name: &str| props.get(&name.to_ascii_lowercase()).copied();

        let id = value_as_int(get(&fields.reach_id), line, &fields.reach_id)?.ok_or_else(|| {
            NetworkError::MissingField {
                field: fields.reach_id.clone(),
            }
        })?;

        records.push(DrainageRecord {
            id,
            next_down: value_as_int(get(&fields.next_down), line, &fields.next_down)?,
            from_node: value_as_int(get(&fields.from_node), line, &fields.from_node)?,
            to_node: value_as_int(get(&fields.to_node), line, &fields.to_node)?,
            divergence: value_as_int(get(&fields.divergence), line, &fields.divergence)?,
            length: value_as_float(get(&fields.length), line, &fields.length)?,
            slope: value_as_float(get(&fields.slope), line, &fields.slope)?,
        });
    }

    tracing::debug!(records = records.len(), "read drainage features");
    Ok(records)
}

fn parse_int(cell: Option<&str>, line: usize, field: &str) -> PrepResult<Option<i64>> {
    match cell {
        None | Some("") => Ok(None),
        Some(s) => {
            if let Ok(v) = s.parse::<i64>() {
                return Ok(Some(v));
            }
            // Attribute tables exported from GIS tools often carry "12.0"
            match s.parse::<f64>() {
                Ok(v) if v.fract() == 0.0 && v.is_finite() => Ok(Some(v as i64)),
                _ => Err(NetworkError::MalformedRow {
                    line,
                    what: format!("{field} = '{s}' is not an integer"),
                }
                .into()),
            }
        }
    }
}

fn parse_float(cell: Option<&str>, line: usize, field: &str) -> PrepResult<Option<f64>> {
    match cell {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<f64>().map(Some).map_err(|_| {
            NetworkError::MalformedRow {
                line,
                what: format!("{field} = '{s}' is not a number"),
            }
            .into()
        }),
    }
}

fn value_as_int(value: Option<&Value>, line: usize, field: &str) -> PrepResult<Option<i64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_i64() {
                Ok(Some(v))
            } else {
                parse_int(Some(&n.to_string()), line, field)
            }
        }
        Some(Value::String(s)) => parse_int(Some(s.trim()), line, field),
        Some(other) => Err(NetworkError::MalformedRow {
            line,
            what: format!("{field} = {other} is not an integer"),
        }
        .into()),
    }
}

fn value_as_float(value: Option<&Value>, line: usize, field: &str) -> PrepResult<Option<f64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => parse_float(Some(s.trim()), line, field),
        Some(other) => Err(NetworkError::MalformedRow {
            line,
            what: format!("{field} = {other} is not a number"),
        }
        .into()),
    }
}
