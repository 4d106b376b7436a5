//! Case-insensitive name resolution.

use std::collections::HashMap;

/// Lower-cased name to canonical (as stored) name.
///
/// Built once per open file so lookups are a single hash probe. When two
/// stored names differ only by case the first one wins.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    map: HashMap<String, String>,
}

impl NameTable {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = HashMap::new();
        for name in names {
            let name = name.as_ref();
            map.entry(name.to_ascii_lowercase())
                .or_insert_with(|| name.to_string());
        }
        Self { map }
    }

    /// Canonical spelling of `name`, if present in any case.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Canonical names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.map.values().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
