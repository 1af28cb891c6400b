//! Durable key-value storage
//!
//! The cache keeps every bucket as one string value under a fixed key, the
//! same way a browser keeps them in local storage. [`FileStore`] persists one
//! file per key; [`MemoryStore`] is for tests and throwaway runs.

pub mod cache;
pub mod pending;

pub use cache::{Bucket, LocalCache, Preferences};
pub use pending::{PendingRequest, ServiceName};

use crate::error::ClientResult;
use fitness_coach_shared::{Entity, NutritionPlan, ProgressEntry, WorkoutPlan};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

/// An entity kept in a cache bucket and owned by a domain service
pub trait Cached: Entity {
    const BUCKET: Bucket;
    const SERVICE: ServiceName;

    /// Owning user id
    fn owner(&self) -> i64;
}

impl Cached for WorkoutPlan {
    const BUCKET: Bucket = Bucket::WorkoutPlans;
    const SERVICE: ServiceName = ServiceName::Workout;

    fn owner(&self) -> i64 {
        self.user_id
    }
}

impl Cached for NutritionPlan {
    const BUCKET: Bucket = Bucket::NutritionPlans;
    const SERVICE: ServiceName = ServiceName::Nutrition;

    fn owner(&self) -> i64 {
        self.user_id
    }
}

impl Cached for ProgressEntry {
    const BUCKET: Bucket = Bucket::ProgressData;
    const SERVICE: ServiceName = ServiceName::Progress;

    fn owner(&self) -> i64 {
        self.user_id
    }
}

/// Synchronous string key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> ClientResult<()>;

    fn remove(&self, key: &str) -> ClientResult<()>;
}

/// One file per key under a directory
///
/// Writes go to a uniquely named temporary sibling first and are renamed into
/// place, so a reader never observes a half-written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the storage directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> ClientResult<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir)?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Unique per write, so concurrent writers to one key never share it
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        self.values().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get("workout_plans").unwrap(), None);
        store.set("workout_plans", "[]").unwrap();
        assert_eq!(store.get("workout_plans").unwrap().as_deref(), Some("[]"));

        store.remove("workout_plans").unwrap();
        assert_eq!(store.get("workout_plans").unwrap(), None);
        // Removing twice is fine
        store.remove("workout_plans").unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileStore::open(dir.path())
            .unwrap()
            .set("backendAvailable", "false")
            .unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("backendAvailable").unwrap().as_deref(), Some("false"));
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("token", "abc").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["token.json".to_string()]);
    }

    #[test]
    fn test_concurrent_writes_to_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        std::thread::scope(|scope| {
            for n in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    for _ in 0..20 {
                        store.set("backendAvailable", &n.to_string()).unwrap();
                    }
                });
            }
        });

        let value: u32 = store.get("backendAvailable").unwrap().unwrap().parse().unwrap();
        assert!(value < 8);
        let files = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let store = FileStore::new("/tmp/x");
        assert_eq!(
            store.path_for("../etc/passwd"),
            PathBuf::from("/tmp/x/___etc_passwd.json")
        );
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }
}
