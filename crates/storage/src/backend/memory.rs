//! In-memory blob store.

use super::KeyStream;
use crate::BlobStore;
use crate::error::Result;
use crate::key::validate as validate_key;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory blob store.
///
/// Blobs are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Nothing survives
/// the process; useful for sessions that opt out of persistence and for
/// tests that need a [`BlobStore`] without filesystem dependencies.
///
/// # Examples
///
/// ```
/// use reel_storage::backend::{BlobStore, MemoryStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::with_entries([
///     ("intro.mp4", b"\x00\x00\x00\x18ftyp"),
/// ]);
/// assert!(store.get("intro.mp4").await?.is_some());
///
/// store.set("outro.mkv", b"data...").await?;
/// assert_eq!(store.keys().await?.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    name: String,
    storage: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a memory store pre-populated with blobs.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then test
    /// should not pass.
    ///
    /// # Example
    ///
    /// ```
    /// use reel_storage::backend::MemoryStore;
    ///
    /// let store = MemoryStore::with_entries([
    ///     ("one.mp4", b"data file 1"),
    ///     ("two.mov", b"data file 2"),
    /// ]);
    /// ```
    pub fn with_entries(entries: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (key, data) in entries {
            let key = key.into();
            if validate_key(&key).is_err() {
                // Deliberate: there is no error result for a broken fixture.
                panic!("MemoryStore::with_entries: invalid key {key:?}");
            }
            map.insert(key, data.into());
        }
        Self {
            name: "memory".to_string(),
            storage: RwLock::new(map),
        }
    }

    /// Change the name of the memory store.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
impl Default for MemoryStore {
    fn default() -> Self {
        let entries: [(&str, &[u8]); 0] = [];
        Self::with_entries(entries)
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = validate_key(key)?;
        Ok(self.storage.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, data: &[u8]) -> Result<()> {
        let key = validate_key(key)?;
        self.storage.write().await.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.storage.write().await.remove(key);
        Ok(())
    }

    fn keys_stream(&self) -> KeyStream<'_> {
        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding to
            // avoid holding the lock across yield points.
            let keys: Vec<String> = self.storage.read().await.keys().cloned().collect();
            for key in keys {
                yield Ok(key);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::default();
        store.set("clip.mp4", b"hello").await.unwrap();
        assert_eq!(store.get("clip.mp4").await.unwrap().as_deref(), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::default();
        assert!(store.get("missing.mp4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = MemoryStore::default();
        store.set("clip.mp4", b"first").await.unwrap();
        store.set("clip.mp4", b"second").await.unwrap();
        assert_eq!(store.get("clip.mp4").await.unwrap().unwrap(), b"second");
        assert_eq!(store.keys().await.unwrap(), vec!["clip.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_with_entries() {
        let store = MemoryStore::with_entries([("a.mp4", Vec::from(*b"1")), ("b.mkv", Vec::from(*b"2"))]);
        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a.mp4".to_string(), "b.mkv".to_string()]);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryStore::with_entries([("clip.mp4", Vec::from(*b"data"))]);
        store.remove("clip.mp4").await.unwrap();
        assert!(store.get("clip.mp4").await.unwrap().is_none());
        // Removing again is fine
        store.remove("clip.mp4").await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_keys_rejected() {
        let store = MemoryStore::default();
        let err = store.set("../escape", b"bad").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
        assert!(store.get("").await.is_err());
        assert!(store.remove("a/b").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid key")]
    fn test_with_entries_panics_on_bad_key() {
        MemoryStore::with_entries([("../escape", Vec::from(*b"bad"))]);
    }
}
