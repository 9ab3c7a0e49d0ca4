//! Media message - an uploaded payload referenced from a room message

use serde::{Deserialize, Serialize};

use crate::value_objects::ContentUri;

/// Kind of media, derived from the MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    File,
}

impl MediaKind {
    /// Classify a MIME type. Anything unrecognised is a generic file.
    pub fn from_content_type(content_type: &str) -> Self {
        let top_level = content_type
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match top_level.as_str() {
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            _ => Self::File,
        }
    }
}

/// A media post that references previously uploaded content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMessage {
    pub location: ContentUri,
    pub content_type: String,
    pub caption: String,
    pub size: usize,
    pub kind: MediaKind,
}

impl MediaMessage {
    /// Create a media message for uploaded content
    pub fn new(
        location: ContentUri,
        content_type: impl Into<String>,
        caption: impl Into<String>,
        size: usize,
    ) -> Self {
        let content_type = content_type.into();
        let kind = MediaKind::from_content_type(&content_type);
        Self {
            location,
            content_type,
            caption: caption.into(),
            size,
            kind,
        }
    }
}
