//! Registry models.
//!
//! [`UploadedFile`] is session state owned by the registry, [`FileView`] is
//! the read-only projection handed to display surfaces, and [`Blob`] is the
//! content that moves between them.

use bytes::Bytes;

/// File content plus its MIME type.
///
/// Cloning is cheap: the bytes are reference counted, so handing a blob to a
/// preview or the command builder never copies the upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    bytes: Bytes,
    mime_type: String,
}
impl Blob {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self { bytes: bytes.into(), mime_type: mime_type.into() }
    }

    /// Content read back from the store, which only keeps opaque bytes. The
    /// MIME type is guessed from the name's extension.
    pub(crate) fn from_store(name: &str, bytes: Vec<u8>) -> Self {
        let mime_type = mime_guess::from_path(name).first_or_octet_stream();
        Self::new(bytes, mime_type.essence_str())
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An upload held in memory for the lifetime of the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    pub(crate) name: String,
    pub(crate) blob: Blob,
}
impl UploadedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blob(&self) -> &Blob {
        &self.blob
    }
}

/// One display row: a known file and whether the store holds it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileView {
    pub name: String,
    pub is_cached: bool,
}
impl FileView {
    pub(crate) fn cached(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_cached: true }
    }

    pub(crate) fn uploaded(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_cached: false }
    }
}
