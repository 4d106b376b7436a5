//! Weight table storage API.

use std::fs;
use std::path::PathBuf;

use rp_weights::WeightTable;

use crate::types::CacheManifest;
use crate::{CacheError, CacheResult};

const MANIFEST: &str = "manifest.json";
const TABLE: &str = "weight_table.csv";

#[derive(Debug, Clone)]
pub struct WeightTableStore {
    root_dir: PathBuf,
}

impl WeightTableStore {
    pub fn new(root_dir: PathBuf) -> CacheResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        let dir = self.entry_dir(key);
        dir.join(MANIFEST).exists() && dir.join(TABLE).exists()
    }

    /// Table first, manifest last, so an interrupted save leaves no entry.
    pub fn save(&self, manifest: &CacheManifest, table: &WeightTable) -> CacheResult<()> {
        let dir = self.entry_dir(&manifest.key);
        fs::create_dir_all(&dir)?;
        table.write_csv(&dir.join(TABLE))?;
        fs::write(dir.join(MANIFEST), serde_json::to_string_pretty(manifest)?)?;
        tracing::debug!(key = %manifest.key, rows = manifest.rows, "cached weight table");
        Ok(())
    }

    pub fn load_manifest(&self, key: &str) -> CacheResult<CacheManifest> {
        let path = self.entry_dir(key).join(MANIFEST);
        if !path.exists() {
            return Err(CacheError::NotFound {
                key: key.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load(&self, key: &str) -> CacheResult<WeightTable> {
        if !self.contains(key) {
            return Err(CacheError::NotFound {
                key: key.to_string(),
            });
        }
        Ok(WeightTable::read_csv(&self.entry_dir(key).join(TABLE))?)
    }

    /// Manifests of every complete entry, newest first.
    pub fn list(&self) -> CacheResult<Vec<CacheManifest>> {
        let mut out = Vec::new();
        if !self.root_dir.exists() {
            return Ok(out);
        }
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let key = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&key) {
                    out.push(manifest);
                }
            }
        }
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    pub fn remove(&self, key: &str) -> CacheResult<()> {
        let dir = self.entry_dir(key);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
