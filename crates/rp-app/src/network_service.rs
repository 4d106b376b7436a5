//! Drainage reading and connectivity construction.

use std::path::Path;

use rp_network::features::{read_drainage_csv, read_drainage_geojson};
use rp_network::{
    write_basin_id_csv, write_connectivity_csv, Connectivity, ConnectivityBuilder,
    ConnectivityOptions, DrainageFields, DrainageRecord, LinkSource,
};
use rp_project::{DrainageFieldsDef, LinkSourceDef, NetworkDef};

use crate::error::AppResult;

/// Summary of a built network for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSummary {
    pub reaches: usize,
    pub outlets: usize,
    pub width: usize,
}

impl NetworkSummary {
    pub fn of(network: &Connectivity) -> Self {
        Self {
            reaches: network.len(),
            outlets: network.outlets().count(),
            width: network.width(),
        }
    }
}

pub fn is_geojson(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("geojson") || e.eq_ignore_ascii_case("json"))
}

/// Read drainage attributes; GeoJSON by extension, delimited text otherwise.
pub fn read_drainage(path: &Path, fields: &DrainageFields) -> AppResult<Vec<DrainageRecord>> {
    let records = if is_geojson(path) {
        read_drainage_geojson(path, fields)?
    } else {
        read_drainage_csv(path, fields)?
    };
    tracing::debug!(path = %path.display(), records = records.len(), "read drainage");
    Ok(records)
}

pub fn build_connectivity(
    records: &[DrainageRecord],
    source: LinkSource,
    options: ConnectivityOptions,
) -> AppResult<Connectivity> {
    Ok(ConnectivityBuilder::from_drainage(records, source, options)?.build()?)
}

/// Write the connectivity file and, when asked, the basin id file.
pub fn write_network(
    network: &Connectivity,
    connectivity: &Path,
    basin_ids: Option<&Path>,
) -> AppResult<()> {
    write_connectivity_csv(network, connectivity)?;
    if let Some(path) = basin_ids {
        write_basin_id_csv(network, path)?;
    }
    Ok(())
}

pub fn drainage_fields(def: &DrainageFieldsDef) -> DrainageFields {
    DrainageFields {
        reach_id: def.reach_id.clone(),
        next_down: def.next_down.clone(),
        from_node: def.from_node.clone(),
        to_node: def.to_node.clone(),
        divergence: def.divergence.clone(),
        length: def.length.clone(),
        slope: def.slope.clone(),
    }
}

pub fn link_source(def: LinkSourceDef) -> LinkSource {
    match def {
        LinkSourceDef::NextDown => LinkSource::NextDown,
        LinkSourceDef::NodeTopology => LinkSource::NodeTopology,
    }
}

pub fn connectivity_options(def: &NetworkDef) -> ConnectivityOptions {
    ConnectivityOptions {
        max_upstream: def.max_upstream,
        outlet_sentinel: def.outlet_sentinel,
    }
}
