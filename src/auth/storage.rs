//! Key/value slot storage backing the [`TokenStore`].
//!
//! A [`SlotStorage`] holds named string slots, the same shape as browser
//! local storage. Two backends are provided:
//!
//! - [`MemoryStorage`]: process-local, for tests and short-lived processes
//! - [`FileStorage`]: a single JSON object on disk, rewritten whole on every
//!   mutation
//!
//! [`TokenStore`]: crate::auth::TokenStore

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backing file or a slot value could not be (de)serialized.
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No platform data directory is available for the default location.
    #[error("No data directory available for session storage")]
    NoDataDirectory,
}

/// A change to apply to one slot: `Some` writes, `None` removes.
pub type SlotChange<'a> = (&'a str, Option<String>);

/// Synchronous named-slot storage.
///
/// Implementations must apply a batch passed to [`SlotStorage::write`] as
/// one unit with respect to concurrent readers of the same instance.
pub trait SlotStorage: Send + Sync + fmt::Debug {
    /// Reads one slot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Reads several slots as one snapshot, in `keys` order.
    ///
    /// The default reads each slot separately; backends that can read under
    /// a single lock should override it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backing store cannot be read.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Applies a batch of slot changes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the changes cannot be persisted.
    fn write(&self, changes: &[SlotChange<'_>]) -> Result<(), StorageError>;
}

fn apply_changes(slots: &mut HashMap<String, String>, changes: &[SlotChange<'_>]) {
    for (key, value) in changes {
        match value {
            Some(value) => {
                slots.insert((*key).to_string(), value.clone());
            }
            None => {
                slots.remove(*key);
            }
        }
    }
}

/// In-memory slot storage.
///
/// # Example
///
/// ```rust
/// use chirp_sdk::auth::{MemoryStorage, SlotStorage};
///
/// let storage = MemoryStorage::new();
/// storage.write(&[("k", Some("v".to_string()))]).unwrap();
/// assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SlotStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.iter().map(|key| slots.get(*key).cloned()).collect())
    }

    fn write(&self, changes: &[SlotChange<'_>]) -> Result<(), StorageError> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        apply_changes(&mut slots, changes);
        Ok(())
    }
}

/// File-backed slot storage.
///
/// All slots live in one JSON object. Writes go to a sibling temporary file
/// that is then renamed over the target, so readers never see a partial file.
/// Parent directories are created on demand.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// File name used under the default location.
    pub const DEFAULT_FILE_NAME: &'static str = "session.json";

    /// Creates storage backed by the file at `path`.
    ///
    /// The file is not touched until the first read or write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates storage at the platform default location,
    /// `{data_dir}/chirp-sdk/session.json`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoDataDirectory`] if the platform exposes no
    /// data directory.
    pub fn at_default_location() -> Result<Self, StorageError> {
        Self::default_location()
            .map(Self::new)
            .ok_or(StorageError::NoDataDirectory)
    }

    /// Returns the platform default location, if any.
    #[must_use]
    pub fn default_location() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("chirp-sdk").join(Self::DEFAULT_FILE_NAME))
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, slots: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(slots)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SlotStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StorageError> {
        let mut slots = self.read_all()?;
        Ok(keys.iter().map(|key| slots.remove(*key)).collect())
    }

    fn write(&self, changes: &[SlotChange<'_>]) -> Result<(), StorageError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut slots = match self.read_all() {
            Ok(slots) => slots,
            Err(StorageError::Serialization(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding corrupt session file"
                );
                HashMap::new()
            }
            Err(e) => return Err(e),
        };

        apply_changes(&mut slots, changes);
        self.write_all(&slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_set_and_remove() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage
            .write(&[("a", Some("1".to_string())), ("b", Some("2".to_string()))])
            .unwrap();
        assert_eq!(storage.len(), 2);

        storage.write(&[("a", None)]).unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
        assert_eq!(storage.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_get_many_preserves_key_order() {
        let storage = MemoryStorage::new();
        storage
            .write(&[("a", Some("1".to_string())), ("c", Some("3".to_string()))])
            .unwrap();

        assert_eq!(
            storage.get_many(&["c", "b", "a"]).unwrap(),
            vec![Some("3".to_string()), None, Some("1".to_string())]
        );
    }

    #[test]
    fn test_file_storage_get_many_reads_one_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("session.json"));
        storage
            .write(&[("a", Some("1".to_string())), ("b", Some("2".to_string()))])
            .unwrap();

        assert_eq!(
            storage.get_many(&["a", "b", "missing"]).unwrap(),
            vec![Some("1".to_string()), Some("2".to_string()), None]
        );
    }

    #[test]
    fn test_file_storage_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert_eq!(storage.get("anything").unwrap(), None);
    }

    #[test]
    fn test_file_storage_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("session.json");
        let storage = FileStorage::new(&path);

        storage.write(&[("k", Some("v".to_string()))]).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_storage_corrupt_file_errors_on_read_and_recovers_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        let storage = FileStorage::new(&path);

        assert!(matches!(
            storage.get("k"),
            Err(StorageError::Serialization(_))
        ));

        storage.write(&[("k", Some("v".to_string()))]).unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_default_location_ends_with_file_name() {
        if let Some(path) = FileStorage::default_location() {
            assert!(path.ends_with("chirp-sdk/session.json"));
        }
    }
}
