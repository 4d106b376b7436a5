//! Catalog and pipeline validation logic.

use std::collections::HashSet;

use rp_network::MAX_UPSTREAM_LIMIT;

use crate::schema::{PipelineConfig, ProfileCatalog};

/// Pipeline files have a single schema version so far.
pub const PIPELINE_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_catalog(catalog: &ProfileCatalog) -> Result<(), ValidationError> {
    if catalog.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: catalog.version,
        });
    }

    let mut names = HashSet::new();
    for entry in &catalog.profiles {
        let profile = &entry.profile;
        if !names.insert(profile.name.to_ascii_lowercase()) {
            return Err(ValidationError::DuplicateId {
                id: profile.name.clone(),
                context: "profiles".to_string(),
            });
        }
        if entry.decumulate.is_some() {
            return Err(ValidationError::Unsupported {
                feature: format!("profile '{}' decumulate", profile.name),
                reason: "replaced by 'accumulation' in catalog version 2".to_string(),
            });
        }
        profile.validate().map_err(|e| ValidationError::InvalidValue {
            field: format!("profile '{}'", profile.name),
            value: profile.name.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Check a pipeline against the catalog its profile comes from.
pub fn validate_pipeline(
    config: &PipelineConfig,
    catalog: &ProfileCatalog,
) -> Result<(), ValidationError> {
    if config.version > PIPELINE_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }
    if catalog.profile(&config.profile).is_none() {
        return Err(ValidationError::MissingReference {
            id: config.profile.clone(),
            context: format!("profile (known: {})", catalog.names().join(", ")),
        });
    }

    if let Some(cap) = config.network.max_upstream {
        if !(1..=MAX_UPSTREAM_LIMIT).contains(&cap) {
            return Err(ValidationError::InvalidValue {
                field: "network.max_upstream".to_string(),
                value: cap.to_string(),
                reason: format!("must lie in [1, {MAX_UPSTREAM_LIMIT}]"),
            });
        }
    }

    let fields = &config.network.fields;
    for (name, value) in [
        ("reach_id", &fields.reach_id),
        ("next_down", &fields.next_down),
        ("length", &fields.length),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("network.fields.{name}"),
                value: value.clone(),
                reason: "must not be empty".to_string(),
            });
        }
    }

    if let Some(weights) = &config.weights {
        if let Some(b) = weights.buffer_deg {
            if !b.is_finite() || b < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: "weights.buffer_deg".to_string(),
                    value: b.to_string(),
                    reason: "must be non-negative and finite".to_string(),
                });
            }
        }
        if weights.reach_field.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "weights.reach_field".to_string(),
                value: weights.reach_field.clone(),
                reason: "must not be empty".to_string(),
            });
        }
    }

    if let Some(inflow) = &config.inflow {
        if config.weights.is_none() {
            return Err(ValidationError::MissingReference {
                id: "weights".to_string(),
                context: "inflow needs a weight table".to_string(),
            });
        }
        if let (Some(label), Some(profile)) = (&inflow.interval, catalog.profile(&config.profile)) {
            if !profile.intervals().any(|i| i.eq_ignore_ascii_case(label)) {
                return Err(ValidationError::InvalidValue {
                    field: "inflow.interval".to_string(),
                    value: label.clone(),
                    reason: format!(
                        "profile '{}' offers {}",
                        profile.name,
                        profile.intervals().collect::<Vec<_>>().join(", ")
                    ),
                });
            }
        }
    }

    if let Some(m) = &config.muskingum {
        m.options.validate().map_err(|e| ValidationError::InvalidValue {
            field: "muskingum.options".to_string(),
            value: m.options.formula.to_string(),
            reason: e.to_string(),
        })?;
    }

    Ok(())
}
