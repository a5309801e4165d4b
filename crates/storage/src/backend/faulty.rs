//! Fault-injecting blob store.
//!
//! Wraps another store and fails chosen operations on chosen keys, so the
//! registry's best-effort failure policy can be exercised in tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{ErrorKind, Result};
use crate::{BlobStore, StoreHandle, backend::KeyStream};

/// A store operation that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Set,
    Remove,
    Keys,
}

/// Fault-injecting blob store.
///
/// Delegates to the wrapped store unless the (operation, key) pair has been
/// armed with [`fail`](Self::fail) or the operation with
/// [`fail_all`](Self::fail_all), in which case it returns a
/// [`BackendError`](ErrorKind::BackendError) without touching the inner store.
///
/// # Examples
///
/// ```
/// use reel_storage::backend::{BlobStore, FaultyStore, MemoryStore, Operation};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = FaultyStore::new(Arc::new(MemoryStore::default()));
/// store.fail(Operation::Set, "clip.mp4");
/// assert!(store.set("clip.mp4", b"data").await.is_err());
/// assert!(store.set("other.mp4", b"data").await.is_ok());
/// # }
/// ```
pub struct FaultyStore {
    inner: StoreHandle,
    faults: Mutex<HashSet<(Operation, Option<String>)>>,
}
impl FaultyStore {
    pub fn new(inner: StoreHandle) -> Self {
        Self { inner, faults: Mutex::new(HashSet::new()) }
    }

    /// Fail `operation` whenever it targets `key`.
    pub fn fail(&self, operation: Operation, key: impl Into<String>) {
        self.lock().insert((operation, Some(key.into())));
    }

    /// Fail `operation` for every key.
    pub fn fail_all(&self, operation: Operation) {
        self.lock().insert((operation, None));
    }

    /// Disarm every fault.
    pub fn heal(&self) {
        self.lock().clear();
    }

    pub fn inner(&self) -> &StoreHandle {
        &self.inner
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<(Operation, Option<String>)>> {
        // A poisoned lock only means another test thread panicked mid-insert.
        self.faults.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, operation: Operation, key: Option<&str>) -> Result<()> {
        let faults = self.lock();
        let armed = faults.contains(&(operation, None))
            || key.is_some_and(|k| faults.contains(&(operation, Some(k.to_string()))));
        if armed {
            tracing::debug!(store = self.inner.name(), ?operation, key, "Injecting store fault");
            exn::bail!(ErrorKind::BackendError(format!("injected {operation:?} fault")));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FaultyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check(Operation::Get, Some(key))?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, data: &[u8]) -> Result<()> {
        self.check(Operation::Set, Some(key))?;
        self.inner.set(key, data).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check(Operation::Remove, Some(key))?;
        self.inner.remove(key).await
    }

    fn keys_stream(&self) -> KeyStream<'_> {
        if let Err(e) = self.check(Operation::Keys, None) {
            return Box::pin(futures::stream::once(async { Err(e) }));
        }
        self.inner.keys_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use std::sync::Arc;

    fn faulty() -> FaultyStore {
        FaultyStore::new(Arc::new(MemoryStore::with_entries([("kept.mp4", Vec::from(*b"data"))])))
    }

    #[tokio::test]
    async fn test_fail_single_key() {
        let store = faulty();
        store.fail(Operation::Remove, "kept.mp4");
        let err = store.remove("kept.mp4").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BackendError(_)));
        assert!(store.inner().get("kept.mp4").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fail_all_keys() {
        let store = faulty();
        store.fail_all(Operation::Keys);
        assert!(store.keys().await.is_err());
        store.heal();
        assert_eq!(store.keys().await.unwrap(), vec!["kept.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_unarmed_operations_delegate() {
        let store = faulty();
        store.fail(Operation::Set, "other.mp4");
        store.set("new.mp4", b"fresh").await.unwrap();
        assert_eq!(store.get("new.mp4").await.unwrap().unwrap(), b"fresh");
    }
}
