//! Upload admission.
//!
//! The upload surface runs every incoming file through an [`UploadGate`]
//! before handing it to the registry. The registry itself trusts its input
//! and never re-validates type or size.

use derive_more::{Display, Error};
use reel_config::UploadConfig;
use std::path::Path;

/// Why an upload was turned away.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[display("{_0} is not an accepted media file")]
    UnsupportedType(#[error(not(source))] String),
    #[display("{name} is {size} bytes, over the {limit} byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },
}

/// Media allow-list and size ceiling for uploads.
///
/// A file is accepted when its MIME type matches an entry (exactly, or by a
/// `type/*` wildcard) **or** its extension matches a `.ext` entry. Both
/// comparisons ignore case.
///
/// # Examples
///
/// ```
/// use reel_cache::UploadGate;
///
/// let gate = UploadGate::default();
/// assert!(gate.admit("clip.mkv", "", 1024).is_ok());
/// assert!(gate.admit("notes.txt", "text/plain", 1024).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadGate {
    mime_types: Vec<String>,
    extensions: Vec<String>,
    max_file_size: u64,
}
impl From<&UploadConfig> for UploadGate {
    fn from(config: &UploadConfig) -> Self {
        let (extensions, mime_types): (Vec<String>, Vec<String>) = config
            .accept
            .iter()
            .map(|entry| entry.trim().to_ascii_lowercase())
            .filter(|entry| !entry.is_empty())
            .partition(|entry| entry.starts_with('.'));
        let extensions = extensions.into_iter().map(|e| e.trim_start_matches('.').to_string()).collect();
        Self { mime_types, extensions, max_file_size: config.max_file_size }
    }
}
impl Default for UploadGate {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}
impl UploadGate {
    pub fn admit(&self, name: &str, mime_type: &str, size: u64) -> Result<(), Rejection> {
        if !self.accepts_mime(mime_type) && !self.accepts_extension(name) {
            tracing::debug!(name, mime_type, "Upload rejected by media allow-list");
            return Err(Rejection::UnsupportedType(name.to_string()));
        }
        if size > self.max_file_size {
            tracing::debug!(name, size, limit = self.max_file_size, "Upload rejected for size");
            return Err(Rejection::TooLarge { name: name.to_string(), size, limit: self.max_file_size });
        }
        Ok(())
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    fn accepts_mime(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if mime_type.is_empty() {
            return false;
        }
        self.mime_types.iter().any(|accepted| match accepted.strip_suffix("/*") {
            Some(top_level) => mime_type.split('/').next() == Some(top_level),
            None => *accepted == mime_type,
        })
    }

    fn accepts_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|extension| self.extensions.contains(&extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("clip.mp4", "video/mp4")]
    #[case("clip.bin", "video/quicktime")]
    #[case("clip.mkv", "")]
    #[case("CLIP.MOV", "")]
    #[case("raw.h264", "application/octet-stream")]
    #[case("old.3gp", "")]
    #[case("no-extension", "VIDEO/MP4")]
    fn test_admit_accepts_media(#[case] name: &str, #[case] mime_type: &str) {
        assert!(UploadGate::default().admit(name, mime_type, 1024).is_ok());
    }

    #[rstest]
    #[case("notes.txt", "text/plain")]
    #[case("song.mp3", "audio/mpeg")]
    #[case("no-extension", "")]
    // A dotfile has no extension.
    #[case(".mp4", "")]
    #[case("video.txt", "videos/mp4")]
    fn test_admit_rejects_other_types(#[case] name: &str, #[case] mime_type: &str) {
        let rejection = UploadGate::default().admit(name, mime_type, 1024).unwrap_err();
        assert_eq!(rejection, Rejection::UnsupportedType(name.to_string()));
    }

    #[test]
    fn test_admit_size_limit() {
        let gate = UploadGate::from(&UploadConfig { accept: vec![".mp4".to_string()], max_file_size: 10 });
        assert!(gate.admit("clip.mp4", "", 10).is_ok());
        let rejection = gate.admit("clip.mp4", "", 11).unwrap_err();
        assert_eq!(rejection, Rejection::TooLarge { name: "clip.mp4".to_string(), size: 11, limit: 10 });
        assert_eq!(rejection.to_string(), "clip.mp4 is 11 bytes, over the 10 byte limit");
    }

    #[test]
    fn test_custom_accept_list() {
        let config = UploadConfig { accept: vec![" .MKV ".to_string(), "audio/*".to_string(), String::new()], max_file_size: 100 };
        let gate = UploadGate::from(&config);
        assert!(gate.admit("a.mkv", "", 1).is_ok());
        assert!(gate.admit("a.mp3", "audio/mpeg", 1).is_ok());
        assert!(gate.admit("a.mp4", "video/mp4", 1).is_err());
        assert_eq!(gate.max_file_size(), 100);
    }
}
