//! rp-project: pipeline files, grid profile catalogs and their validation.

pub mod migrate;
pub mod schema;
pub mod validate;

use std::path::Path;

pub use migrate::{migrate_to_latest, LATEST_VERSION};
pub use schema::*;
pub use validate::{validate_catalog, validate_pipeline, ValidationError, PIPELINE_VERSION};

pub type ProjectResult<T> = Result<T, ProjectError>;

const BUILTIN_CATALOG: &str = include_str!("../profiles/builtin.yaml");

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Profiles shipped with the crate.
pub fn builtin_catalog() -> ProjectResult<ProfileCatalog> {
    parse_catalog_yaml(BUILTIN_CATALOG)
}

pub fn parse_catalog_yaml(content: &str) -> ProjectResult<ProfileCatalog> {
    let catalog: ProfileCatalog = serde_yaml::from_str(content)?;
    let catalog = migrate_to_latest(catalog)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

/// Load a catalog file, YAML or JSON by extension.
pub fn load_catalog(path: &Path) -> ProjectResult<ProfileCatalog> {
    let content = std::fs::read_to_string(path)?;
    if is_json(path) {
        let catalog: ProfileCatalog = serde_json::from_str(&content)?;
        let catalog = migrate_to_latest(catalog)?;
        validate_catalog(&catalog)?;
        Ok(catalog)
    } else {
        parse_catalog_yaml(&content)
    }
}

pub fn save_catalog(path: &Path, catalog: &ProfileCatalog) -> ProjectResult<()> {
    validate_catalog(catalog)?;
    let content = if is_json(path) {
        serde_json::to_string_pretty(catalog)?
    } else {
        serde_yaml::to_string(catalog)?
    };
    std::fs::write(path, content)?;
    Ok(())
}

/// Built-in profiles, overlaid with the pipeline's own catalog if it names one.
pub fn catalog_for(config: &PipelineConfig) -> ProjectResult<ProfileCatalog> {
    let mut catalog = builtin_catalog()?;
    if let Some(path) = &config.profiles {
        catalog.merge(load_catalog(path)?);
    }
    Ok(catalog)
}

/// Load a pipeline file; relative paths resolve against its directory.
pub fn load_pipeline(path: &Path) -> ProjectResult<PipelineConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: PipelineConfig = if is_json(path) {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    if let Some(base) = path.parent() {
        config.rebase(base);
    }
    let catalog = catalog_for(&config)?;
    validate_pipeline(&config, &catalog)?;
    Ok(config)
}

pub fn save_pipeline(path: &Path, config: &PipelineConfig) -> ProjectResult<()> {
    let catalog = catalog_for(config)?;
    validate_pipeline(config, &catalog)?;
    let content = if is_json(path) {
        serde_json::to_string_pretty(config)?
    } else {
        serde_yaml::to_string(config)?
    };
    std::fs::write(path, content)?;
    Ok(())
}
