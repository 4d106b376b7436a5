//! Grid profile lookup.

use std::path::Path;

use rp_inflow::GridProfile;
use rp_project::{builtin_catalog, load_catalog, ProfileCatalog};

use crate::error::{AppError, AppResult};

/// Built-in profiles, overlaid with `extra` when given.
pub fn profile_catalog(extra: Option<&Path>) -> AppResult<ProfileCatalog> {
    let mut catalog = builtin_catalog()?;
    if let Some(path) = extra {
        catalog.merge(load_catalog(path)?);
    }
    Ok(catalog)
}

pub fn resolve_profile(catalog: &ProfileCatalog, name: &str) -> AppResult<GridProfile> {
    catalog
        .profile(name)
        .cloned()
        .ok_or_else(|| AppError::ProfileNotFound(format!("{name} (known: {})", catalog.names().join(", "))))
}
