//! Manifest cache: a meta-level speedup that memoizes each `BUILD` file's
//! parsed toml tree under `<object_dir>/.repomake-cache/`, keyed by the
//! file's on-disk modification time. Memoizes parsed manifests only,
//! never build artifacts.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::errors::CacheError;

const CACHE_DIR_NAME: &str = ".repomake-cache";

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    modified: SystemTime,
    value: toml::Value,
}

pub struct BuildFileCache {
    dir: PathBuf,
}

impl BuildFileCache {
    pub fn new(object_dir: &Path) -> Result<Self, CacheError> {
        let dir = object_dir.join(CACHE_DIR_NAME);
        std::fs::create_dir_all(&dir).map_err(CacheError::FailedToCache)?;
        Ok(Self { dir })
    }

    /// Returns the cached parse of `build_file` if present and not stale
    /// relative to its current modification time. A miss (cold cache,
    /// corrupted entry, or a file that has since changed) is not an
    /// error: the caller falls back to a fresh parse.
    pub fn get(&self, build_file: &Path) -> Option<toml::Value> {
        let modified = std::fs::metadata(build_file).and_then(|m| m.modified()).ok()?;
        let contents = std::fs::read_to_string(self.entry_path(build_file)).ok()?;
        let entry: CacheEntry = serde_json::from_str(&contents).ok()?;
        if entry.modified < modified {
            return None;
        }
        Some(entry.value)
    }

    pub fn store(&self, build_file: &Path, value: &toml::Value) -> Result<(), CacheError> {
        let modified = std::fs::metadata(build_file)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let entry = CacheEntry {
            modified,
            value: value.clone(),
        };
        let file = std::fs::File::create(self.entry_path(build_file))
            .map_err(CacheError::FailedToCache)?;
        serde_json::to_writer(file, &entry).map_err(CacheError::FailedToWrite)
    }

    fn entry_path(&self, build_file: &Path) -> PathBuf {
        let key: String = build_file
            .display()
            .to_string()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{key}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_is_retrievable() {
        let tmp = tempdir::TempDir::new("cache").unwrap();
        let build_file = tmp.path().join("BUILD");
        std::fs::write(&build_file, "[[target]]\ntype=\"filegroup\"\nname=\"x\"\n").unwrap();
        let cache = BuildFileCache::new(tmp.path()).unwrap();
        let value: toml::Value = toml::from_str(&std::fs::read_to_string(&build_file).unwrap()).unwrap();
        cache.store(&build_file, &value).unwrap();
        assert_eq!(cache.get(&build_file), Some(value));
    }

    #[test]
    fn modifying_the_file_after_caching_invalidates_it() {
        let tmp = tempdir::TempDir::new("cache").unwrap();
        let build_file = tmp.path().join("BUILD");
        std::fs::write(&build_file, "[[target]]\ntype=\"filegroup\"\nname=\"x\"\n").unwrap();
        let cache = BuildFileCache::new(tmp.path()).unwrap();
        let value: toml::Value = toml::from_str(&std::fs::read_to_string(&build_file).unwrap()).unwrap();
        cache.store(&build_file, &value).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(&build_file, "[[target]]\ntype=\"filegroup\"\nname=\"y\"\n").unwrap();
        assert!(cache.get(&build_file).is_none());
    }

    #[test]
    fn missing_entry_is_a_cache_miss() {
        let tmp = tempdir::TempDir::new("cache").unwrap();
        let build_file = tmp.path().join("BUILD");
        std::fs::write(&build_file, "").unwrap();
        let cache = BuildFileCache::new(tmp.path()).unwrap();
        assert!(cache.get(&build_file).is_none());
    }
}
