//! Local filesystem blob store.
//!
//! Each key is stored as one file directly inside a configured root
//! directory, accessed via `tokio::fs` for async I/O. Keys can never contain
//! a separator, so the root is never walked recursively.

use crate::backend::KeyStream;
use crate::error::{ErrorKind, Result};
use crate::{BlobStore, key::validate as validate_key};
use async_stream::stream;
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

/// Local filesystem blob store.
///
/// # Examples
///
/// ```no_run
/// use reel_storage::backend::LocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("browser-cache", "/var/lib/reel/cache")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalStore {
    name: String,
    /// Directory holding one file per key
    root: PathBuf,
}
impl LocalStore {
    /// Create a new local filesystem store.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, exists but is not a
    /// directory, or cannot be created.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::BackendError(format!("root `{}` is not absolute", root.display())));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::BackendError(format!("root `{}` is not a directory", root.display())));
            }
        } else {
            // Non-async on purpose: it happens once at startup and it's not
            // worth making the constructor async for.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root.display().to_string()))?;
            tracing::debug!(root = %root.display(), "Created local store root directory");
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates the key and joins it with the root directory.
    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_key(key)?))
    }

    fn map_io_error(e: std::io::Error, key: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(key.to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Returns the key for a directory entry, or `None` for anything that
    /// isn't a regular file with a valid UTF-8 key as its name.
    async fn entry_key(entry: DirEntry) -> Result<Option<String>> {
        let file_type = entry.file_type().await.map_err(ErrorKind::Io)?;
        if !file_type.is_file() {
            return Ok(None);
        }
        // Files dropped into the directory by hand may not be valid keys;
        // skip them rather than fail the whole listing.
        Ok(entry.file_name().into_string().ok().filter(|name| validate_key(name).is_ok()))
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.absolute_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => exn::bail!(Self::map_io_error(e, key)),
        }
    }

    async fn set(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.absolute_path(key)?;
        Ok(fs::write(&path, data).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.absolute_path(key)?;
        match fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => exn::bail!(Self::map_io_error(e, key)),
            _ => Ok(()),
        }
    }

    fn keys_stream(&self) -> KeyStream<'_> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                // Root removed out from under us: nothing is cached.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return,
                Err(err) => {
                    yield Err(exn::Exn::from(ErrorKind::Io(err)));
                    return;
                }
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => { yield Err(exn::Exn::from(ErrorKind::Io(e))); continue; },
                };
                match Self::entry_key(entry).await {
                    Ok(Some(key)) => yield Ok(key),
                    Ok(None) => {},
                    Err(e) => yield Err(e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("local", temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalStore::new("name", temp_dir.path()).is_ok());
        assert!(LocalStore::new("name", "relative/path").is_err());
        assert!(LocalStore::new("name", "./relative").is_err());
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("nested/cache");
        let store = LocalStore::new("name", &root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root);
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, b"data").unwrap();
        assert!(LocalStore::new("name", &file).is_err());
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (_dir, store) = store();
        store.set("clip.mp4", b"Hello, world!").await.unwrap();
        assert_eq!(store.get("clip.mp4").await.unwrap().unwrap(), b"Hello, world!");
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (_dir, store) = store();
        assert!(store.get("missing.mp4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let (_dir, store) = store();
        store.set("clip.mp4", b"data").await.unwrap();
        store.remove("clip.mp4").await.unwrap();
        assert!(store.get("clip.mp4").await.unwrap().is_none());
        // Removing a missing key is not an error
        store.remove("clip.mp4").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_only_lists_files() {
        let (dir, store) = store();
        store.set("b.mkv", b"data").await.unwrap();
        store.set("a.mp4", b"data").await.unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a.mp4".to_string(), "b.mkv".to_string()]);
    }

    #[tokio::test]
    async fn test_keys_empty_directory() {
        let (_dir, store) = store();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keys_survive_new_instance() {
        let (dir, store) = store();
        store.set("clip.mp4", b"data").await.unwrap();
        drop(store);
        let reopened = LocalStore::new("local", dir.path()).unwrap();
        assert_eq!(reopened.keys().await.unwrap(), vec!["clip.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_key_security() {
        let (_dir, store) = store();
        assert!(store.get("../etc/passwd").await.is_err());
        assert!(store.set("../escape", b"data").await.is_err());
        assert!(store.set("nested/clip.mp4", b"data").await.is_err());
        assert!(store.remove("..").await.is_err());
    }
}
