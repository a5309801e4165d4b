//! Persistent blob store contract for reel.
//!
//! The cache registry never touches a browser storage API or filesystem
//! directly; it talks to a [`BlobStore`] through a shared [`StoreHandle`].

pub mod backend;
pub mod error;
mod key;

pub use crate::backend::BlobStore;
pub use crate::key::validate as validate_key;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn BlobStore + Send + Sync>;
