//! Cache data types.

use rp_core::ReachId;
use serde::{Deserialize, Serialize};

pub type WeightKey = String;

/// Everything a weight table depends on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightKeyInput {
    /// Reach universe in connectivity order.
    pub reach_ids: Vec<ReachId>,
    /// SHA-256 of the catchment file bytes.
    pub catchments_digest: String,
    pub catchment_id_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// Grid point coordinates, row-major.
    pub grid_lon: Vec<f64>,
    pub grid_lat: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_deg: Option<f64>,
    pub reach_field: String,
    pub index_labels: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheManifest {
    pub key: WeightKey,
    pub timestamp: String,
    pub profile: String,
    pub reach_field: String,
    pub reaches: usize,
    pub rows: usize,
    pub builder_version: String,
}

impl CacheManifest {
    /// Manifest for `table`, stamped now.
    pub fn describe(
        key: WeightKey,
        profile: &str,
        table: &rp_weights::WeightTable,
        builder_version: &str,
    ) -> Self {
        Self {
            key,
            timestamp: chrono::Utc::now().to_rfc3339(),
            profile: profile.to_string(),
            reach_field: table.reach_field().to_string(),
            reaches: table.reach_ids().len(),
            rows: table.len(),
            builder_version: builder_version.to_string(),
        }
    }
}
