//! File-based key-value store for persistent storage.

use crate::backend::KvStore;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const VALUE_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// A directory-backed key-value store.
///
/// Each key is stored in its own file inside the store directory. Keys are
/// percent-encoded into file names, so any non-empty key is accepted.
///
/// # Durability
///
/// - `set_item` writes to a temporary file, calls `sync_all()`, then renames
///   it over the previous value, so a crash leaves either the old or the new
///   value but never a partial one
/// - `remove_item` deletes the file; removing a missing key succeeds
///
/// # Example
///
/// ```no_run
/// use lifesync_storage::{FileKvStore, KvStore};
/// use std::path::Path;
///
/// # async fn demo() -> lifesync_storage::StorageResult<()> {
/// let store = FileKvStore::open(Path::new("data")).await?;
/// store.set_item("lifesync:tasks:records", "[]").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    /// Opens or creates a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(root: &Path) -> StorageResult<Self> {
        tokio::fs::create_dir_all(root).await?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Lists all keys that currently hold a value, in sorted order.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or a file name is
    /// not a valid encoded key.
    pub async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(decode_key(stem)?);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn value_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self
            .root
            .join(format!("{}.{VALUE_EXTENSION}", encode_key(key))))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.value_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StorageError::Corrupted(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.value_path(key)?;
        let temp = path.with_extension(TEMP_EXTENSION);

        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp, &path).await?;
        tracing::trace!(key, bytes = value.len(), "stored value");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        let path = self.value_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn encode_key(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

fn decode_key(encoded: &str) -> StorageResult<String> {
    urlencoding::decode(encoded)
        .map(|key| key.into_owned())
        .map_err(|_| StorageError::Corrupted(format!("bad key encoding: {encoded}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn file_open_creates_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("store");

        let store = FileKvStore::open(&root).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(store.path(), root);
    }

    #[tokio::test]
    async fn file_set_and_get() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).await.unwrap();

        store.set_item("lifesync:tasks:records", "[1]").await.unwrap();
        let value = store.get_item("lifesync:tasks:records").await.unwrap();
        assert_eq!(value.as_deref(), Some("[1]"));
    }

    #[tokio::test]
    async fn file_missing_key_is_none() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get_item("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_overwrite_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).await.unwrap();

        store.set_item("k", "first").await.unwrap();
        store.set_item("k", "second").await.unwrap();

        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("second"));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["k.json".to_string()]);
    }

    #[tokio::test]
    async fn file_persistence() {
        let dir = tempdir().unwrap();

        {
            let store = FileKvStore::open(dir.path()).await.unwrap();
            store.set_item("marker", "2024-06-02").await.unwrap();
        }

        {
            let store = FileKvStore::open(dir.path()).await.unwrap();
            let value = store.get_item("marker").await.unwrap();
            assert_eq!(value.as_deref(), Some("2024-06-02"));
        }
    }

    #[tokio::test]
    async fn file_remove() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).await.unwrap();

        store.set_item("k", "v").await.unwrap();
        store.remove_item("k").await.unwrap();
        store.remove_item("k").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_keys_round_trip_encoding() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).await.unwrap();

        store.set_item("lifesync:cursor:reviews.daily", "x").await.unwrap();
        store.set_item("plain", "y").await.unwrap();

        let keys = store.keys().await.unwrap();
        assert_eq!(
            keys,
            vec![
                "lifesync:cursor:reviews.daily".to_string(),
                "plain".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn file_empty_key_rejected() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.set_item("", "v").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn path_like_keys_stay_inside_the_store() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("store");
        let store = FileKvStore::open(&root).await.unwrap();

        store.set_item("../escape", "x").await.unwrap();
        store.set_item("a/b", "y").await.unwrap();
        assert_eq!(store.get_item("../escape").await.unwrap().as_deref(), Some("x"));
        assert_eq!(
            store.keys().await.unwrap(),
            vec!["../escape".to_string(), "a/b".to_string()]
        );
        assert!(!dir.path().join("escape.json").exists());
    }

    #[test]
    fn key_encoding_is_reversible() {
        for key in ["a:b", "x.y-z_1", "日本", "%41", "a/b", "..", "c\\d"] {
            assert_eq!(decode_key(&encode_key(key)).unwrap(), key);
        }
    }

    proptest::proptest! {
        #[test]
        fn encoded_keys_are_file_name_safe(key in "\\PC{1,40}") {
            let encoded = encode_key(&key);
            proptest::prop_assert!(encoded
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"_-.~%".contains(&b)));
            proptest::prop_assert_eq!(decode_key(&encoded).unwrap(), key);
        }
    }
}
