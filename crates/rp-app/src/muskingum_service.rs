//! Muskingum coefficients from drainage attributes.

use std::collections::BTreeSet;
use std::path::Path;

use rp_core::ReachId;
use rp_muskingum::{
    attributes_from_drainage, MuskingumOptions, MuskingumParameterBuilder, MuskingumParameters,
};
use rp_network::{Connectivity, DrainageRecord};
use rp_weights::reservoir_reaches;

use crate::error::{AppError, AppResult};
use crate::network_service::is_geojson;

/// Reservoir polygons and the drainage-line geometry they are tested against.
pub struct ReservoirInput<'a> {
    pub drainage: &'a Path,
    pub id_field: &'a str,
    pub reservoirs: &'a Path,
}

pub fn flag_reservoirs(input: &ReservoirInput) -> AppResult<BTreeSet<ReachId>> {
    if !is_geojson(input.drainage) {
        return Err(AppError::Configuration(format!(
            "reservoir flags need drainage line geometry, {} is not GeoJSON",
            input.drainage.display()
        )));
    }
    let flagged = reservoir_reaches(input.drainage, input.id_field, input.reservoirs)?;
    tracing::info!(reaches = flagged.len(), "reaches crossing reservoirs");
    Ok(flagged)
}

pub fn build_muskingum(
    network: &Connectivity,
    records: &[DrainageRecord],
    options: MuskingumOptions,
    reservoirs: Option<&ReservoirInput>,
) -> AppResult<MuskingumParameters> {
    let flagged = match reservoirs {
        Some(input) => flag_reservoirs(input)?,
        None => BTreeSet::new(),
    };
    let attributes = attributes_from_drainage(records);
    Ok(MuskingumParameterBuilder::new(options).build(network, &attributes, &flagged)?)
}

/// Write the three coefficient files.
pub fn write_muskingum(
    params: &MuskingumParameters,
    kfac: &Path,
    k: &Path,
    x: &Path,
) -> AppResult<()> {
    params.write_files(kfac, k, x)?;
    Ok(())
}
