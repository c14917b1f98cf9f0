//! Upload intake and the extension allowlist.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MediaError;

/// Kind of media a file was submitted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A video clip, registered remotely before analysis.
    Video,
    /// A still image, normalized locally and sent inline.
    Image,
}

impl MediaKind {
    /// Lowercase extensions accepted for this kind.
    #[must_use]
    pub const fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Video => &["mp4", "mov", "avi"],
            Self::Image => &["jpg", "jpeg", "png", "jfif"],
        }
    }

    /// Returns `true` if `extension` is on the allowlist (case-insensitive).
    #[must_use]
    pub fn accepts(self, extension: &str) -> bool {
        self.allowed_extensions()
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    /// Heading shown above an answer for this kind.
    #[must_use]
    pub const fn result_heading(self) -> &'static str {
        match self {
            Self::Video => "Result",
            Self::Image => "AI Response",
        }
    }

    /// Suffix of the temporary file holding the normalized bytes.
    #[must_use]
    pub const fn temp_suffix(self) -> &'static str {
        match self {
            Self::Video => ".mp4",
            Self::Image => ".jpg",
        }
    }

    /// Get the string representation of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file received from the user, checked against the allowlist.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    file_name: String,
    extension: String,
    bytes: Vec<u8>,
    kind: MediaKind,
}

impl UploadedMedia {
    /// Accept an upload of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::UnsupportedExtension`] when the file name's
    /// extension is missing or not allowed for `kind`.
    pub fn new(
        kind: MediaKind,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, MediaError> {
        let file_name = file_name.into();
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if !kind.accepts(&extension) {
            return Err(MediaError::UnsupportedExtension {
                kind,
                extension,
                allowed: kind.allowed_extensions().join(", "),
            });
        }

        Ok(Self {
            file_name,
            extension,
            bytes,
            kind,
        })
    }

    /// Accept a video upload.
    ///
    /// # Errors
    ///
    /// See [`UploadedMedia::new`].
    pub fn video(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, MediaError> {
        Self::new(MediaKind::Video, file_name, bytes)
    }

    /// Accept an image upload.
    ///
    /// # Errors
    ///
    /// See [`UploadedMedia::new`].
    pub fn image(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, MediaError> {
        Self::new(MediaKind::Image, file_name, bytes)
    }

    /// Original file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Lowercased extension.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Raw uploaded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the upload and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Kind the file was submitted as.
    #[must_use]
    pub const fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the upload carried no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// MIME type sent to the model.
    ///
    /// Videos use the names Gemini lists for its supported containers
    /// (`video/mov`, `video/avi`) instead of the registered
    /// `video/quicktime` and `video/x-msvideo`. Images are guessed from
    /// the extension.
    #[must_use]
    pub fn mime_type(&self) -> String {
        match (self.kind, self.extension.as_str()) {
            (MediaKind::Video, "mov") => "video/mov".to_owned(),
            (MediaKind::Video, "avi") => "video/avi".to_owned(),
            (MediaKind::Video, _) => "video/mp4".to_owned(),
            (MediaKind::Image, ext) => mime_guess::from_ext(ext)
                .first_or_octet_stream()
                .essence_str()
                .to_owned(),
        }
    }
}

impl fmt::Debug for UploadedMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedMedia")
            .field("file_name", &self.file_name)
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}
