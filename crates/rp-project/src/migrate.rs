//! Catalog schema migration.

use rp_inflow::Accumulation;

use crate::schema::ProfileCatalog;
use crate::ProjectError;

pub const LATEST_VERSION: u32 = 2;

pub fn migrate_to_latest(mut catalog: ProfileCatalog) -> Result<ProfileCatalog, ProjectError> {
    while catalog.version < LATEST_VERSION {
        catalog = migrate_one_version(catalog)?;
    }
    Ok(catalog)
}

fn migrate_one_version(catalog: ProfileCatalog) -> Result<ProfileCatalog, ProjectError> {
    match catalog.version {
        1 => migrate_v1_to_v2(catalog),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 1 flagged cumulative products with `decumulate: true`.
fn migrate_v1_to_v2(mut catalog: ProfileCatalog) -> Result<ProfileCatalog, ProjectError> {
    for entry in &mut catalog.profiles {
        if let Some(decumulate) = entry.decumulate.take() {
            entry.profile.accumulation = if decumulate {
                Accumulation::Cumulative
            } else {
                Accumulation::Incremental
            };
        }
    }
    catalog.version = 2;
    Ok(catalog)
}
