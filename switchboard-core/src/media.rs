//! Media acceptance rule shared by inbound messages and uploads

use crate::MediaError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted media size (16 MiB)
pub const MAX_MEDIA_SIZE: u64 = 16 * 1024 * 1024;

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

const VIDEO_TYPES: &[&str] = &["video/mp4", "video/3gpp", "video/quicktime"];

const AUDIO_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp4",
    "audio/ogg",
    "audio/aac",
    "audio/amr",
];

const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "application/zip",
    "application/x-rar-compressed",
];

/// Classified media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaType {
    /// Lowercase name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }

    /// Content used for a media message that arrived without a caption
    pub fn placeholder(&self) -> String {
        format!("[{}]", self.as_str().to_uppercase())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a declared MIME type.
///
/// Parameters such as `; charset=utf-8` are ignored and matching is
/// case-insensitive. Every input maps to exactly one media type or to
/// [`MediaError::UnsupportedMediaType`].
pub fn classify_mime(mime_type: &str) -> Result<MediaType, MediaError> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let kind = if IMAGE_TYPES.contains(&essence.as_str()) {
        MediaType::Image
    } else if VIDEO_TYPES.contains(&essence.as_str()) {
        MediaType::Video
    } else if AUDIO_TYPES.contains(&essence.as_str()) {
        MediaType::Audio
    } else if DOCUMENT_TYPES.contains(&essence.as_str()) {
        MediaType::Document
    } else {
        return Err(MediaError::UnsupportedMediaType(mime_type.to_string()));
    };

    Ok(kind)
}

/// Reject payloads above `max` bytes.
pub fn validate_media_size(size: u64, max: u64) -> Result<(), MediaError> {
    if size > max {
        return Err(MediaError::FileTooLarge { size, max });
    }
    Ok(())
}
