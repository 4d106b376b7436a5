//! Content-based hashing for weight table keys.

use sha2::{Digest, Sha256};

use crate::types::{WeightKey, WeightKeyInput};

pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn compute_weight_key(input: &WeightKeyInput, builder_version: &str) -> WeightKey {
    let mut hasher = Sha256::new();

    let input_json = serde_json::to_string(input).unwrap_or_default();
    hasher.update(input_json.as_bytes());

    hasher.update(builder_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> WeightKeyInput {
        WeightKeyInput {
            reach_ids: vec![101, 102],
            catchments_digest: digest_bytes(b"{\"type\":\"FeatureCollection\",\"features\":[]}"),
            catchment_id_field: "DrainLnID".to_string(),
            crs: None,
            grid_lon: vec![0.0, 0.5, 1.0],
            grid_lat: vec![10.0, 10.5],
            buffer_deg: None,
            reach_field: "rivid".to_string(),
            index_labels: "lon_lat".to_string(),
        }
    }

    #[test]
    fn hash_stability() {
        let a = compute_weight_key(&input(), "v1");
        assert_eq!(a, compute_weight_key(&input(), "v1"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let base = compute_weight_key(&input(), "v1");

        let mut moved = input();
        moved.grid_lon[1] = 0.25;
        assert_ne!(base, compute_weight_key(&moved, "v1"));

        let mut reordered = input();
        reordered.reach_ids.reverse();
        assert_ne!(base, compute_weight_key(&reordered, "v1"));

        assert_ne!(base, compute_weight_key(&input(), "v2"));
    }
}
