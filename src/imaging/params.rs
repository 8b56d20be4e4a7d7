//! Parameter types for image operations.
//!
//! These types describe *what* to produce, not *how*. They are the interface
//! between the search in [`operations`](super::operations), which decides
//! which attempt to make next, and the [`backend`](super::backend), which does
//! the pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality as a percentage (1–100). Clamped on construction.
//! - [`MediaFormat`]: one of the three raster formats we read and write.
//! - [`OutputFormat`]: policy for picking the encoded format from the source format.
//! - [`EncodeParams`]: format + quality for a single encode attempt.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Quality setting for lossy image encoding, in percent (1-100).
///
/// Stored as an integer so that stepping down by 10 lands exactly on the
/// floor instead of drifting through `0.29999999999999993`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality as a 0–1 fraction.
    pub fn as_fraction(self) -> f32 {
        self.0 as f32 / 100.0
    }

    /// Lower quality by `step` percentage points, never below 1.
    pub fn step_down(self, step: u32) -> Self {
        Self::new(self.0.saturating_sub(step))
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(92)
    }
}

/// Raster formats the sanitizer can decode and encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
}

impl MediaFormat {
    /// The MIME type written on sanitized output.
    pub fn media_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpeg",
            MediaFormat::Png => "png",
            MediaFormat::Gif => "gif",
        }
    }

    /// Parse a declared MIME type. Parameters after `;` are ignored.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(MediaFormat::Jpeg),
            "image/png" => Some(MediaFormat::Png),
            "image/gif" => Some(MediaFormat::Gif),
            _ => None,
        }
    }

    /// Map a file name's extension to a format.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" | "jfif" => Some(MediaFormat::Jpeg),
            "png" => Some(MediaFormat::Png),
            "gif" => Some(MediaFormat::Gif),
            _ => None,
        }
    }

    /// Identify the format from its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Jpeg => Some(MediaFormat::Jpeg),
            image::ImageFormat::Png => Some(MediaFormat::Png),
            image::ImageFormat::Gif => Some(MediaFormat::Gif),
            _ => None,
        }
    }

    /// Resolve the source format: magic bytes, then declared type, then file
    /// extension.
    ///
    /// Content wins so that a PNG saved as `screenshot.jpg` still decodes.
    pub fn resolve(media_type: Option<&str>, file_name: &str, bytes: &[u8]) -> Option<Self> {
        Self::sniff(bytes)
            .or_else(|| media_type.and_then(Self::from_media_type))
            .or_else(|| Self::from_file_name(file_name))
    }

    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            MediaFormat::Jpeg => image::ImageFormat::Jpeg,
            MediaFormat::Png => image::ImageFormat::Png,
            MediaFormat::Gif => image::ImageFormat::Gif,
        }
    }
}

impl std::fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which format sanitized images are encoded to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Always JPEG.
    #[default]
    Jpeg,
    /// Keep PNG and GIF sources in their own format; JPEG stays JPEG.
    PreserveSource,
}

impl OutputFormat {
    pub fn resolve(self, source: MediaFormat) -> MediaFormat {
        match self {
            OutputFormat::Jpeg => MediaFormat::Jpeg,
            OutputFormat::PreserveSource => source,
        }
    }
}

/// Parameters for a single encode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: MediaFormat,
    pub quality: Quality,
}
