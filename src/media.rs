use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::viewport::NaturalSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            _ => None,
        }
    }

    /// Pan and zoom gestures only apply to images; video/audio keep native controls.
    pub fn is_image(&self) -> bool {
        matches!(self, MediaKind::Image)
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let lower = mime.trim().to_lowercase();
        if lower.starts_with("image/") {
            Some(MediaKind::Image)
        } else if lower.starts_with("video/") {
            Some(MediaKind::Video)
        } else if lower.starts_with("audio/") {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaFile {
    pub kind: MediaKind,
    pub mime: String,
    pub name: String,
}

pub fn probe(path: &Path) -> Result<MediaFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read media file: {}", path.display()))?;
    let mime = detect_mime(&bytes, Some(path)).ok_or_else(|| {
        anyhow!(
            "unable to detect media type for '{}' (expected image, video or audio)",
            path.display()
        )
    })?;
    let kind = MediaKind::from_mime(&mime)
        .ok_or_else(|| anyhow!("unsupported media type '{}'", mime))?;
    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("media")
        .to_string();
    tracing::debug!(path = %path.display(), %mime, "probed media file");
    Ok(MediaFile { kind, mime, name })
}

pub fn natural_size(path: &Path) -> Result<NaturalSize> {
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("failed to read image dimensions: {}", path.display()))?;
    Ok(NaturalSize { width, height })
}

pub fn detect_mime(bytes: &[u8], path: Option<&Path>) -> Option<String> {
    if let Some(kind) = infer::get(bytes) {
        let detected = kind.mime_type();
        if MediaKind::from_mime(detected).is_some() {
            return Some(detected.to_string());
        }
    }
    let ext = path
        .and_then(|path| path.extension())
        .and_then(|value| value.to_str())
        .map(|value| value.to_lowercase())?;
    mime_from_extension(&ext).map(|value| value.to_string())
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "mov" => Some("video/quicktime"),
        "mkv" => Some("video/x-matroska"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "m4a" => Some("audio/mp4"),
        "flac" => Some("audio/flac"),
        "ogg" => Some("audio/ogg"),
        _ => None,
    }
}
