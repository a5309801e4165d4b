use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use reel_config::{StoreConfig, StoreKind};
use reel_storage::StoreHandle;
use reel_storage::backend::{LocalStore, MemoryStore};
use std::sync::Arc;

/// Builds the blob store described by the configuration.
///
/// A local store without a configured root lands in the platform data
/// directory.
pub fn open_store(config: &StoreConfig) -> Result<StoreHandle> {
    let store: StoreHandle = match config.kind {
        StoreKind::Memory => Arc::new(MemoryStore::default().with_name(&config.name)),
        StoreKind::Local => {
            let root = config.root_or_default().or_raise(|| ErrorKind::Config)?;
            Arc::new(LocalStore::new(&config.name, &root).or_raise(|| ErrorKind::Config)?)
        },
    };
    tracing::info!(store = store.name(), kind = ?config.kind, "Opened blob store");
    Ok(store)
}
