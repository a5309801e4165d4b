//! Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Store failures are wrapped, never exposed bare, so the
//! storage frame shows up as a child in the tree.

use derive_more::{Display, Error};

/// A registry error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Neither the session uploads nor the store hold content for the name.
    /// Show a placeholder; retrying will not help.
    #[display("file not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Writing an upload to the store failed. Registry state is unchanged.
    #[display("failed to cache file: {_0}")]
    StorageWrite(#[error(not(source))] String),
    /// The name can never be used as a store key, so the file can only live
    /// in memory for this session.
    #[display("file name cannot be cached: {_0}")]
    InvalidName(#[error(not(source))] String),
    /// Listing the store's keys failed. Registry state is unchanged.
    #[display("failed to list cached files")]
    StorageList,
    /// The configured store could not be opened.
    #[display("failed to open store from configuration")]
    Config,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageWrite(_) | Self::StorageList)
    }
}
