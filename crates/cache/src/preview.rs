//! Content resolution owned by a display element.
//!
//! A row that shows a download link or preview needs the file's content, but
//! the row can be torn down, or switched to another file, while the content
//! is still loading. [`Preview`] owns that load: results for a name the
//! preview no longer shows are never published, and the resolved blob is
//! released as soon as the preview moves on or is dropped.

use crate::models::Blob;
use crate::registry::Registry;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Clone, Debug)]
enum Slot {
    Pending,
    Ready(Blob),
    Failed,
    Cancelled,
}

/// A cancellable, in-flight [`Registry::resolve_content`] for one name.
///
/// Must be created inside a Tokio runtime.
///
/// # Examples
///
/// ```
/// use reel_cache::{Preview, Registry};
/// use reel_storage::backend::MemoryStore;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let registry = Arc::new(Registry::new(Arc::new(MemoryStore::default())));
/// registry.ingest_upload("clip.mp4", b"frames".to_vec(), "video/mp4");
///
/// let mut preview = Preview::spawn(registry.clone(), "clip.mp4");
/// let blob = preview.ready().await.expect("upload resolves");
/// assert_eq!(blob.mime_type(), "video/mp4");
/// # }
/// ```
pub struct Preview {
    registry: Arc<Registry>,
    name: String,
    slot: watch::Receiver<Slot>,
    task: Option<JoinHandle<()>>,
}

impl Preview {
    pub fn spawn(registry: Arc<Registry>, name: impl Into<String>) -> Self {
        let name = name.into();
        let (slot, task) = Self::start(registry.clone(), name.clone());
        Self { registry, name, slot, task: Some(task) }
    }

    fn start(registry: Arc<Registry>, name: String) -> (watch::Receiver<Slot>, JoinHandle<()>) {
        let (sender, receiver) = watch::channel(Slot::Pending);
        let task = tokio::spawn(async move {
            let slot = match registry.resolve_content(&name).await {
                Ok(blob) => Slot::Ready(blob),
                Err(e) => {
                    tracing::debug!(name = %name, error = ?e, "Preview content unavailable");
                    Slot::Failed
                },
            };
            // No receiver means the preview moved on: the result is stale.
            let _ = sender.send(slot);
        });
        (receiver, task)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved content, if it has arrived.
    pub fn current(&self) -> Option<Blob> {
        match &*self.slot.borrow() {
            Slot::Ready(blob) => Some(blob.clone()),
            _ => None,
        }
    }

    /// Waits for resolution to finish.
    ///
    /// Returns `None` if the content could not be resolved or the preview was
    /// cancelled.
    pub async fn ready(&mut self) -> Option<Blob> {
        let slot = self.slot.wait_for(|slot| !matches!(slot, Slot::Pending)).await.ok()?;
        match &*slot {
            Slot::Ready(blob) => Some(blob.clone()),
            Slot::Failed | Slot::Cancelled | Slot::Pending => None,
        }
    }

    /// Points the preview at another file.
    ///
    /// The in-flight load is cancelled and any resolved content released
    /// before loading `name`. Retargeting to the current name does nothing.
    pub fn retarget(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name == self.name {
            return;
        }
        self.cancel();
        let (slot, task) = Self::start(self.registry.clone(), name.clone());
        self.name = name;
        self.slot = slot;
        self.task = Some(task);
    }

    /// Stops loading and releases any resolved content.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        // Swapping the receiver drops our handle on the old value and
        // detaches us from a sender that might still publish.
        let (_, cancelled) = watch::channel(Slot::Cancelled);
        self.slot = cancelled;
    }
}

impl Drop for Preview {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
