//! Client-side file cache and input selection for reel.
//!
//! Large media uploads are kept in a persistent blob store so they survive a
//! reload without being uploaded again. This crate tracks which files exist
//! and where their content lives, and which of them are selected as inputs
//! for the transcoding command.
//!
//! # Architecture
//! - **[`Registry`]**: owns the list of known files and their provenance:
//!   *uploaded* (held in memory for this session), *cached* (present in the
//!   store), or both. It is the only writer to the store.
//! - **[`Selection`]**: the filenames marked as command inputs. Lives inside
//!   the registry so deleting a file also deselects it.
//! - **[`Preview`]**: a cancellable content load owned by a display element.
//! - **[`UploadGate`]**: the media allow-list the upload surface applies
//!   before anything reaches the registry.

pub mod error;
mod gate;
mod models;
mod name;
mod preview;
mod registry;
mod selection;
mod store;

pub use crate::gate::{Rejection, UploadGate};
pub use crate::models::{Blob, FileView, UploadedFile};
pub use crate::name::normalize as normalize_name;
pub use crate::preview::Preview;
pub use crate::registry::{Promotion, Registry};
pub use crate::selection::Selection;
pub use crate::store::open_store;
