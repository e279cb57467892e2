//! The file marker wrapper.
//!
//! A field is file-valued iff its value is wrapped in [`FileData`]; nothing
//! else distinguishes uploads from ordinary data in the call protocol.

/// Type expression emitted for file-valued fields in generated request
/// declarations.
pub const FILE_MARKER_TYPE: &str = "FileData";

/// An in-memory file to upload as one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    file_name: String,
    content: Vec<u8>,
    mime_type: Option<String>,
}

impl FileData {
    /// Wrap raw bytes under a file name.
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
            mime_type: None,
        }
    }

    /// Attach an explicit MIME type to the part.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }
}
