//! CLI output formatting for `sanitize` and `inspect`.
//!
//! # Output Format
//!
//! ## Sanitize
//!
//! ```text
//! 001 IMG_2041.jpg
//!     Source: photos/IMG_2041.jpg (jpeg, 6000x4000, 10.2 MB)
//!     Output: sanitized/IMG_2041.jpg (jpeg, 1920x1280, 3.1 MB)
//!     Quality: 92 after 1 attempt
//!     Stripped: Exif, XMP
//!
//! Sanitized 1 image, 10.2 MB → 3.1 MB
//! ```
//!
//! An image that hit the search floor gets an extra line:
//!
//! ```text
//!     Budget: exceeded, search floor reached (4.0 MB limit)
//! ```
//!
//! ## Inspect
//!
//! ```text
//! IMG_2041.jpg
//!     Format: jpeg, 6000x4000, 10.2 MB
//!     Metadata: Exif (12.0 KB), XMP (3.1 KB)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::{Dimensions, MediaFormat, MetadataKind, MetadataSegment};
use crate::sanitize::SanitizedImage;
use serde::Serialize;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Human-readable byte size: `512 B`, `12.0 KB`, `3.1 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

/// Distinct metadata kinds, in first-seen order.
fn distinct_kinds(segments: &[MetadataSegment]) -> Vec<MetadataKind> {
    let mut kinds = Vec::new();
    for segment in segments {
        if !kinds.contains(&segment.kind) {
            kinds.push(segment.kind);
        }
    }
    kinds
}

fn describe(format: MediaFormat, dimensions: Dimensions, bytes: u64) -> String {
    format!("{format}, {dimensions}, {}", format_bytes(bytes))
}

// ============================================================================
// Sanitize
// ============================================================================

/// One processed file: where it came from, where it went, and the result.
#[derive(Debug, Clone)]
pub struct SanitizeEntry {
    pub source: PathBuf,
    pub written: PathBuf,
    pub image: SanitizedImage,
}

pub fn format_sanitize_entry(index: usize, entry: &SanitizeEntry, max_bytes: u64) -> Vec<String> {
    let image = &entry.image;
    let mut lines = vec![
        format!("{:03} {}", index + 1, image.name),
        format!(
            "    Source: {} ({})",
            entry.source.display(),
            describe(image.source_format, image.source_dimensions, image.source_bytes)
        ),
        format!(
            "    Output: {} ({})",
            entry.written.display(),
            describe(image.format, image.dimensions, image.len() as u64)
        ),
        format!(
            "    Quality: {} after {}",
            image.quality.value(),
            plural(image.attempts as usize, "attempt", "attempts")
        ),
    ];

    let kinds = distinct_kinds(&image.stripped);
    if !kinds.is_empty() {
        let labels: Vec<&str> = kinds.iter().map(|k| k.label()).collect();
        lines.push(format!("    Stripped: {}", labels.join(", ")));
    }
    if !image.within_budget {
        lines.push(format!(
            "    Budget: exceeded, search floor reached ({} limit)",
            format_bytes(max_bytes)
        ));
    }
    lines
}

pub fn format_sanitize_output(entries: &[SanitizeEntry], max_bytes: u64) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        lines.extend(format_sanitize_entry(i, entry, max_bytes));
    }

    let before: u64 = entries.iter().map(|e| e.image.source_bytes).sum();
    let after: u64 = entries.iter().map(|e| e.image.len() as u64).sum();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Sanitized {}, {} → {}",
        plural(entries.len(), "image", "images"),
        format_bytes(before),
        format_bytes(after)
    ));

    let over = entries.iter().filter(|e| !e.image.within_budget).count();
    if over > 0 {
        lines.push(format!(
            "{} over budget at the search floor",
            plural(over, "image", "images")
        ));
    }
    lines
}

pub fn print_sanitize_output(entries: &[SanitizeEntry], max_bytes: u64) {
    for line in format_sanitize_output(entries, max_bytes) {
        println!("{}", line);
    }
}

/// Machine-readable form of a [`SanitizeEntry`].
#[derive(Debug, Serialize)]
pub struct SanitizeReport<'a> {
    pub name: &'a str,
    pub source: &'a Path,
    pub output: &'a Path,
    pub media_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub quality: u32,
    pub attempts: u32,
    pub bytes: usize,
    pub source_bytes: u64,
    pub within_budget: bool,
    pub stripped: &'a [MetadataSegment],
}

impl<'a> From<&'a SanitizeEntry> for SanitizeReport<'a> {
    fn from(entry: &'a SanitizeEntry) -> Self {
        let image = &entry.image;
        Self {
            name: &image.name,
            source: &entry.source,
            output: &entry.written,
            media_type: image.media_type(),
            width: image.dimensions.width,
            height: image.dimensions.height,
            quality: image.quality.value(),
            attempts: image.attempts,
            bytes: image.len(),
            source_bytes: image.source_bytes,
            within_budget: image.within_budget,
            stripped: &image.stripped,
        }
    }
}

pub fn format_sanitize_json(entries: &[SanitizeEntry]) -> serde_json::Result<String> {
    let reports: Vec<SanitizeReport> = entries.iter().map(SanitizeReport::from).collect();
    serde_json::to_string_pretty(&reports)
}

// ============================================================================
// Inspect
// ============================================================================

/// What `inspect` learned about one file.
#[derive(Debug, Clone)]
pub struct InspectEntry {
    pub path: PathBuf,
    pub format: Option<MediaFormat>,
    pub dimensions: Option<Dimensions>,
    pub bytes: u64,
    pub metadata: Vec<MetadataSegment>,
}

pub fn format_inspect_entry(entry: &InspectEntry) -> Vec<String> {
    let name = entry
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry.path.display().to_string());

    let format_line = match (entry.format, entry.dimensions) {
        (Some(format), Some(dims)) => describe(format, dims, entry.bytes),
        (Some(format), None) => format!("{format}, unreadable header, {}", format_bytes(entry.bytes)),
        (None, _) => format!("unsupported, {}", format_bytes(entry.bytes)),
    };

    let metadata_line = if entry.metadata.is_empty() {
        "none".to_string()
    } else {
        entry
            .metadata
            .iter()
            .map(|s| format!("{} ({})", s.kind.label(), format_bytes(s.len as u64)))
            .collect::<Vec<_>>()
            .join(", ")
    };

    vec![
        name,
        format!("    Format: {format_line}"),
        format!("    Metadata: {metadata_line}"),
    ]
}

pub fn print_inspect_output(entries: &[InspectEntry]) {
    for entry in entries {
        for line in format_inspect_entry(entry) {
            println!("{}", line);
        }
    }
}
