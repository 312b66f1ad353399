//! Uploaded media and sampled frames.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of media accepted by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a declared MIME type. Returns `None` for anything that is
    /// neither `image/*` nor `video/*`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if content_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else if content_type.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single uploaded file, alive for the duration of one request.
#[derive(Clone)]
pub struct MediaUpload {
    /// Raw file bytes
    pub data: Vec<u8>,
    /// Declared MIME type
    pub content_type: String,
    /// Kind derived from the MIME type
    pub kind: MediaKind,
}

impl MediaUpload {
    /// Build an upload, rejecting content types that are not image or video.
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Option<Self> {
        let content_type = content_type.into();
        let kind = MediaKind::from_content_type(&content_type)?;
        Some(Self {
            data,
            content_type,
            kind,
        })
    }

    /// Size of the upload in bytes.
    pub fn declared_size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for MediaUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaUpload")
            .field("content_type", &self.content_type)
            .field("kind", &self.kind)
            .field("size", &self.data.len())
            .finish()
    }
}

/// A still image extracted from a video, JPEG encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Index of the frame in the source video
    pub index: u64,
    /// Encoded image bytes
    pub data: Vec<u8>,
}

impl Frame {
    pub const CONTENT_TYPE: &'static str = "image/jpeg";

    pub fn new(index: u64, data: Vec<u8>) -> Self {
        Self { index, data }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("size", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_content_type() {
        assert_eq!(MediaKind::from_content_type("image/png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_content_type("video/mp4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_content_type("Video/WebM"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_content_type("text/plain"), None);
        assert_eq!(MediaKind::from_content_type("application/octet-stream"), None);
        assert_eq!(MediaKind::from_content_type(""), None);
    }

    #[test]
    fn test_upload_rejects_unsupported_type() {
        assert!(MediaUpload::new(b"hello".to_vec(), "text/plain").is_none());

        let upload = MediaUpload::new(vec![0u8; 42], "image/jpeg").unwrap();
        assert_eq!(upload.kind, MediaKind::Image);
        assert_eq!(upload.declared_size(), 42);
    }

    #[test]
    fn test_frame_debug_omits_bytes() {
        let frame = Frame::new(7, vec![1, 2, 3]);
        assert_eq!(format!("{:?}", frame), "Frame { index: 7, size: 3 }");
    }
}
