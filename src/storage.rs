//! Local persistent key-value storage for guest carts.
//!
//! Values are opaque strings (the cart stores a JSON array). [`FileStorage`]
//! keeps one file per key under a per-session directory; [`MemoryStorage`]
//! lives only as long as the process.

use std::{collections::HashMap, io::ErrorKind, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{fs, sync::RwLock};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
}

#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

#[async_trait]
impl LocalStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).await?;
        // write-then-rename so a reader never sees a half-written value
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Removes the key, then the session directory once it holds nothing.
    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        match fs::remove_dir(&self.root).await {
            Ok(()) => Ok(()),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty
                ) =>
            {
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<RwLock<HashMap<String, String>>>,
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("storefront-storage-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn file_storage_missing_key_reads_as_none() {
        let storage = FileStorage::new(temp_root());
        assert_eq!(storage.get_item("cart").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_storage_overwrites_and_removes() {
        let root = temp_root();
        let storage = FileStorage::new(&root);

        storage.set_item("cart", "[1]").await.unwrap();
        storage.set_item("cart", "[1,2]").await.unwrap();
        assert_eq!(storage.get_item("cart").await.unwrap().as_deref(), Some("[1,2]"));

        storage.remove_item("cart").await.unwrap();
        assert_eq!(storage.get_item("cart").await.unwrap(), None);
        assert!(!root.exists());
        // removing twice is fine
        storage.remove_item("cart").await.unwrap();
    }

    #[tokio::test]
    async fn file_storage_keeps_a_directory_with_other_keys() {
        let root = temp_root();
        let storage = FileStorage::new(&root);

        storage.set_item("cart", "[]").await.unwrap();
        storage.set_item("other", "x").await.unwrap();
        storage.remove_item("cart").await.unwrap();

        assert!(root.exists());
        assert_eq!(storage.get_item("other").await.unwrap().as_deref(), Some("x"));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn file_storage_rejects_path_like_keys() {
        let storage = FileStorage::new(temp_root());
        let err = storage.set_item("../escape", "x").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn memory_storage_clones_share_state() {
        let storage = MemoryStorage::default();
        let other = storage.clone();
        storage.set_item("cart", "[]").await.unwrap();
        assert_eq!(other.get_item("cart").await.unwrap().as_deref(), Some("[]"));
    }
}
