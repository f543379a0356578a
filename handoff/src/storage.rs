//! Storage that survives full page navigation.
//!
//! Values are opaque strings under well-known key prefixes scoped by a
//! [`HandoffId`]; [`load_json`] and [`store_json`] layer typed access on top.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::HandoffError;
use crate::id::HandoffId;

/// Pending handoff context, cleared when the completion endpoint finishes.
pub const HANDOFF_CONTEXT_KEY: &str = "digilocker_handoff_context";

/// Verified document data for the destination page to consume once.
pub const VERIFIED_DATA_KEY: &str = "digilocker_verified_data";

pub fn context_key(handoff_id: &HandoffId) -> String {
    format!("{HANDOFF_CONTEXT_KEY}_{handoff_id}")
}

pub fn verified_data_key(handoff_id: &HandoffId) -> String {
    format!("{VERIFIED_DATA_KEY}_{handoff_id}")
}

/// A string key/value store that outlives in-memory state.
pub trait RecoverableStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, HandoffError>;
    fn set(&self, key: &str, value: &str) -> Result<(), HandoffError>;
    fn remove(&self, key: &str) -> Result<(), HandoffError>;
}

pub fn load_json<T: DeserializeOwned>(
    storage: &dyn RecoverableStorage,
    key: &str,
) -> Result<Option<T>, HandoffError> {
    match storage.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn store_json<T: Serialize>(
    storage: &dyn RecoverableStorage,
    key: &str,
    value: &T,
) -> Result<(), HandoffError> {
    storage.set(key, &serde_json::to_string(value)?)
}

/// One JSON file per key inside a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, HandoffError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, HandoffError> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(HandoffError::Storage(format!("invalid storage key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl RecoverableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, HandoffError> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HandoffError> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash never leaves a half-written value.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), HandoffError> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_set_get_remove() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = FileStorage::open(dir.path()).unwrap();

        assert_eq!(storage.get("missing").unwrap(), None);
        storage.set("k", "v1").unwrap();
        storage.set("k", "v2").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));
        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        FileStorage::open(dir.path())
            .unwrap()
            .set(HANDOFF_CONTEXT_KEY, "{}")
            .unwrap();
        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get(HANDOFF_CONTEXT_KEY).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn scoped_keys_are_valid_file_names() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = FileStorage::open(dir.path()).unwrap();
        let id = HandoffId::new();
        storage.set(&context_key(&id), "{}").unwrap();
        storage.set(&verified_data_key(&id), "{}").unwrap();
        assert_ne!(context_key(&id), context_key(&HandoffId::new()));
        assert_eq!(storage.get(&context_key(&id)).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn path_traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(storage.set("../escape", "x").is_err());
        assert!(storage.get("").is_err());
    }

    #[test]
    fn typed_helpers_report_corrupt_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set("n", "not json").unwrap();
        let loaded: Result<Option<u32>, _> = load_json(&storage, "n");
        assert!(matches!(loaded, Err(HandoffError::Storage(_))));

        store_json(&storage, "n", &7u32).unwrap();
        assert_eq!(load_json::<u32>(&storage, "n").unwrap(), Some(7));
    }
}
