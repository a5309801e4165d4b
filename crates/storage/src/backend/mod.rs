//! Blob store trait and implementations.
//!
//! This module defines the `BlobStore` trait: a single untyped asynchronous
//! key/value store over opaque binary blobs, addressable by string key. The
//! registry in `reel-cache` is its only writer.
//!

#[cfg(feature = "mock")]
mod faulty;
mod local;
mod memory;

#[cfg(feature = "mock")]
pub use self::faulty::{FaultyStore, Operation};
pub use self::local::LocalStore;
pub use self::memory::MemoryStore;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

pub type KeyStream<'a> = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;

/// Unified interface for persistent blob stores.
///
/// All operations are asynchronous; the store may sit behind a browser
/// storage API, a directory on disk, or plain memory. Keys are exactly the
/// filenames tracked by the registry and must pass
/// [`validate_key`](crate::validate_key). Implementations should enforce this
/// validation.
///
/// # Examples
///
/// ```
/// use reel_storage::{backend::BlobStore, error::Result};
///
/// async fn size_of_cached_clip(store: &dyn BlobStore) -> Result<u64> {
///     match store.get("clip-one.mp4").await? {
///         Some(data) => Ok(data.len() as u64),
///         None => Ok(0),
///     }
/// }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// Fetch the blob stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored under the key; a missing entry
    /// is not an error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use reel_storage::{backend::BlobStore, error::Result};
    /// # async fn example(store: &dyn BlobStore) -> Result<()> {
    /// if let Some(data) = store.get("clip-one.mp4").await? {
    ///     println!("Read {} bytes", data.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `data` under `key`, overwriting any existing blob.
    async fn set(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Remove the blob stored under `key`.
    ///
    /// Removing a key that does not exist succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// List every key currently in the store.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`keys_stream()`](Self::keys_stream) into a [`Vec`] before
    /// returning. No ordering is guaranteed.
    async fn keys(&self) -> Result<Vec<String>> {
        self.keys_stream().try_collect().await
    }

    /// Stream every key currently in the store.
    ///
    /// Yields results incrementally; an error item does not necessarily end
    /// the stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use reel_storage::{backend::BlobStore, error::Result};
    /// # async fn example(store: &dyn BlobStore) -> Result<()> {
    /// let mut stream = store.keys_stream();
    /// while let Some(key) = stream.try_next().await? {
    ///     println!("cached: {key}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn keys_stream(&self) -> KeyStream<'_>;
}
