//! Key validation.
//!
//! Store keys are bare filenames. Anything that could be interpreted as a
//! path by a filesystem-backed store is rejected up front, so every
//! implementation can treat a validated key as a single path component.

use crate::error::{ErrorKind, Result};

/// Validates a store key.
///
/// > **Note:** Keys are *not* normalised. A key that would need rewriting to
/// >           be safe is rejected instead, because the registry tracks keys
/// >           verbatim and a silently rewritten key would never be found again.
///
/// # Examples
///
/// ```
/// use reel_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("clip-one.mp4").is_ok());
/// assert!(validate_key(".hidden.mkv").is_ok());
/// // Invalid keys
/// assert!(validate_key("").is_err());
/// assert!(validate_key("..").is_err());
/// assert!(validate_key("dir/clip.mp4").is_err());
/// assert!(validate_key("a\0b").is_err());
/// ```
pub fn validate(key: &str) -> Result<&str> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0']);
    if invalid {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    Ok(key)
}
