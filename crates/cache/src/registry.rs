//! The file registry.
//!
//! Owns every known filename and where its content lives: in memory as a
//! session upload, in the persistent store, or both. Display surfaces read
//! [`Registry::list_view`]; every mutation, including every store write, goes
//! through a registry method.

use crate::error::{ErrorKind, Result};
use crate::models::{Blob, FileView, UploadedFile};
use crate::name::normalize;
use crate::selection::Selection;
use bytes::Bytes;
use exn::ResultExt;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use reel_storage::{StoreHandle, validate_key};
use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::instrument;

/// Outcome of [`Registry::promote_to_cache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Promotion {
    /// The upload was written to the store and the name is now cached.
    Cached,
    /// The name was already cached; nothing was written.
    AlreadyCached,
    /// No upload with that name exists in this session; nothing was written.
    NoUpload,
}

#[derive(Debug, Default)]
struct State {
    /// Upload order; a re-upload moves its name to the end.
    uploads: Vec<UploadedFile>,
    cached: BTreeSet<String>,
    selection: Selection,
}
impl State {
    fn upload(&self, name: &str) -> Option<&UploadedFile> {
        self.uploads.iter().find(|f| f.name == name)
    }
}

/// File registry and input selection for one session.
///
/// Share it behind an [`Arc`](std::sync::Arc). The in-memory state is behind a
/// lock that is never held across a store call, so async operations may
/// interleave at store I/O:
///
/// - a sync racing a promote cannot lose the promoted name, because sync only
///   ever adds to the cached set;
/// - two promotes of the same name may both write, ending in the same state
///   as one;
/// - a delete racing a promote resolves to whichever commits last;
/// - a promote that commits while [`delete_all`](Self::delete_all) is still
///   removing blobs keeps its name cached, matching the blob it left in the
///   store.
///
/// # Examples
///
/// ```
/// use reel_cache::Registry;
/// use reel_storage::backend::MemoryStore;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Registry::new(Arc::new(MemoryStore::default()));
/// let name = registry.ingest_upload("clip one.mp4", b"...".to_vec(), "video/mp4");
/// assert_eq!(name, "clip-one.mp4");
///
/// registry.promote_to_cache(&name).await?;
/// assert!(registry.list_view()[0].is_cached);
/// # Ok(())
/// # }
/// ```
pub struct Registry {
    store: StoreHandle,
    state: RwLock<State>,
}

impl Registry {
    pub fn new(store: StoreHandle) -> Self {
        Self { store, state: RwLock::new(State::default()) }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    // Nothing panics while holding the lock, but a poisoned lock still holds
    // consistent state: every mutation below is a single infallible step.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Every known file, once each.
    ///
    /// Cached names come first in lexicographic order, flagged as cached even
    /// if an upload with the same name also exists. Uploads that aren't
    /// cached follow in upload order.
    pub fn list_view(&self) -> Vec<FileView> {
        let state = self.read();
        let cached = state.cached.iter().map(FileView::cached);
        let uploaded = state.uploads.iter().filter(|f| !state.cached.contains(&f.name)).map(|f| FileView::uploaded(&f.name));
        cached.chain(uploaded).collect()
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.read().cached.contains(name)
    }

    /// Cached names, sorted.
    pub fn cached_names(&self) -> Vec<String> {
        self.read().cached.iter().cloned().collect()
    }

    pub fn uploaded(&self, name: &str) -> Option<UploadedFile> {
        self.read().upload(name).cloned()
    }

    /// Session upload names, in upload order.
    pub fn uploaded_names(&self) -> Vec<String> {
        self.read().uploads.iter().map(|f| f.name.clone()).collect()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn is_selected(&self, name: &str) -> bool {
        self.read().selection.is_selected(name)
    }

    /// Flips whether `name` is a command input and returns the new state.
    ///
    /// Any name may be selected; it is not checked against the known files.
    pub fn toggle(&self, name: &str) -> bool {
        self.write().selection.toggle(name)
    }

    pub fn selection(&self) -> Selection {
        self.read().selection.clone()
    }

    /// Selected names in display order (the order of [`list_view`](Self::list_view)).
    ///
    /// This is the order the command builder writes inputs in. Selected names
    /// that no longer match a known file are left out.
    pub fn selected_inputs(&self) -> Vec<String> {
        let selection = self.selection();
        self.list_view().into_iter().map(|view| view.name).filter(|name| selection.is_selected(name)).collect()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Registers an upload for this session and returns the name it is
    /// tracked under.
    ///
    /// Spaces in `name` become hyphens. An existing upload with the same
    /// (normalised) name is replaced and moves to the end of the upload
    /// order. The store is not touched.
    pub fn ingest_upload(&self, name: &str, bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> String {
        let name = normalize(name);
        let file = UploadedFile { name: name.clone(), blob: Blob::new(bytes, mime_type) };
        let mut state = self.write();
        let replaced = state.uploads.iter().any(|f| f.name == name);
        state.uploads.retain(|f| f.name != name);
        tracing::debug!(name = %name, bytes = file.blob.len(), replaced, "Ingested upload");
        state.uploads.push(file);
        name
    }

    /// Drops the session upload `name`, returning whether there was one.
    ///
    /// A cached copy stays cached and resolvable, and the selection is left
    /// alone. Use [`delete_file`](Self::delete_file) to forget a file entirely.
    pub fn discard_upload(&self, name: &str) -> bool {
        let mut state = self.write();
        let before = state.uploads.len();
        state.uploads.retain(|f| f.name != name);
        let discarded = state.uploads.len() != before;
        tracing::debug!(name, discarded, "Discarded upload");
        discarded
    }

    /// Replaces the session uploads wholesale.
    ///
    /// Names are normalised as in [`ingest_upload`](Self::ingest_upload) and a
    /// repeated name keeps its last entry. The cached set, the selection and
    /// the store are untouched.
    pub fn set_uploads<N, B, M>(&self, files: impl IntoIterator<Item = (N, B, M)>)
    where
        N: AsRef<str>,
        B: Into<Bytes>,
        M: Into<String>,
    {
        let mut uploads: Vec<UploadedFile> = Vec::new();
        for (name, bytes, mime_type) in files {
            let name = normalize(name.as_ref());
            uploads.retain(|f| f.name != name);
            uploads.push(UploadedFile { name, blob: Blob::new(bytes, mime_type) });
        }
        tracing::debug!(count = uploads.len(), "Replaced uploads");
        self.write().uploads = uploads;
    }

    /// Writes the session upload `name` to the store and marks it cached.
    ///
    /// The cached set only changes after the store write succeeds; on a write
    /// failure the error is logged and returned with registry state untouched.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn promote_to_cache(&self, name: &str) -> Result<Promotion> {
        let blob = {
            let state = self.read();
            if state.cached.contains(name) {
                return Ok(Promotion::AlreadyCached);
            }
            match state.upload(name) {
                Some(file) => file.blob.clone(),
                None => {
                    tracing::debug!("No session upload to cache");
                    return Ok(Promotion::NoUpload);
                },
            }
        };
        // Ingestion only rewrites spaces, so a name can still be unstorable.
        if let Err(e) = validate_key(name) {
            tracing::warn!(error = ?e, "Upload name cannot be used as a store key");
            return Err(e).or_raise(|| ErrorKind::InvalidName(name.to_string()));
        }
        if let Err(e) = self.store.set(name, blob.bytes()).await {
            tracing::warn!(error = ?e, "Failed to write upload to the store");
            return Err(e).or_raise(|| ErrorKind::StorageWrite(name.to_string()));
        }
        self.write().cached.insert(name.to_string());
        tracing::info!(bytes = blob.len(), "Cached upload");
        Ok(Promotion::Cached)
    }

    /// Adds every key in the store to the cached set.
    ///
    /// One-directional: names already in the cached set stay there even if
    /// the store no longer lists them. Only an explicit delete removes them.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn sync_cached_from_storage(&self) -> Result<()> {
        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = ?e, "Failed to list cached files");
                return Err(e).or_raise(|| ErrorKind::StorageList);
            },
        };
        let mut state = self.write();
        let before = state.cached.len();
        state.cached.extend(keys);
        tracing::debug!(discovered = state.cached.len() - before, total = state.cached.len(), "Synced cached files");
        Ok(())
    }

    /// Returns the content for `name`.
    ///
    /// Session uploads win; otherwise a cached name is read from the store.
    /// Fails with [`NotFound`](ErrorKind::NotFound) when neither yields
    /// content, including when a cached entry disappeared from the store.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn resolve_content(&self, name: &str) -> Result<Blob> {
        let cached = {
            let state = self.read();
            if let Some(file) = state.upload(name) {
                return Ok(file.blob.clone());
            }
            state.cached.contains(name)
        };
        if cached {
            match self.store.get(name).await {
                Ok(Some(bytes)) => return Ok(Blob::from_store(name, bytes)),
                Ok(None) => tracing::warn!("Cached file is missing from the store"),
                Err(e) => {
                    tracing::warn!(error = ?e, "Failed to read cached file");
                    return Err(e).or_raise(|| ErrorKind::NotFound(name.to_string()));
                },
            }
        }
        exn::bail!(ErrorKind::NotFound(name.to_string()))
    }

    /// Forgets `name` everywhere: store, cached set, session uploads and the
    /// input selection.
    ///
    /// Best effort: if the store removal fails it is logged and the name is
    /// still dropped from the registry.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn delete_file(&self, name: &str) {
        let cached = self.is_cached(name);
        if cached {
            match self.store.remove(name).await {
                Ok(()) => tracing::info!("Removed cached file"),
                Err(e) => tracing::warn!(error = ?e, "Failed to remove cached file; forgetting it anyway"),
            }
        }
        let mut state = self.write();
        state.cached.remove(name);
        state.uploads.retain(|f| f.name != name);
        state.selection.remove(name);
    }

    /// Empties the cached set, the session uploads and the input selection,
    /// then removes every formerly cached file from the store.
    ///
    /// Store removals run concurrently; each failure is logged on its own and
    /// does not stop the reset. A blob left behind by a failed removal shows
    /// up again on the next sync.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn delete_all(&self) {
        let names = {
            let mut state = self.write();
            state.uploads.clear();
            state.selection.clear();
            std::mem::take(&mut state.cached)
        };
        let mut removals: FuturesUnordered<_> =
            names.iter().map(|name| async move { (name, self.store.remove(name).await) }).collect();
        let mut failed = 0usize;
        while let Some((name, result)) = removals.next().await {
            if let Err(e) = result {
                failed += 1;
                tracing::warn!(key = %name, error = ?e, "Failed to remove cached file during reset");
            }
        }
        tracing::info!(removed = names.len() - failed, failed, "Cleared all files");
    }
}
