//! Shared test utilities for the upload-scrub test suite.
//!
//! Builds synthetic images in memory so tests never depend on fixture files:
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let jpeg = jpeg_bytes(&gradient_image(640, 480), 90);
//! let tagged = with_jpeg_segment(&jpeg, 0xE1, &exif_payload());
//! assert!(!scan_metadata(&tagged).is_empty());
//! ```

use image::{ExtendedColorType, ImageEncoder, RgbImage};

// =========================================================================
// Pixel sources
// =========================================================================

/// Smooth gradient that JPEG compresses well.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Deterministic per-pixel noise that barely compresses at any quality.
pub fn noise_image(width: u32, height: u32) -> RgbImage {
    let mut state: u32 = 0x9E37_79B9;
    RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        image::Rgb([next(), next(), next()])
    })
}

// =========================================================================
// Encoders
// =========================================================================

pub fn jpeg_bytes(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

// =========================================================================
// Metadata injection
// =========================================================================

/// Insert a marker segment directly after a JPEG's SOI marker.
pub fn with_jpeg_segment(jpeg: &[u8], marker: u8, payload: &[u8]) -> Vec<u8> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");
    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&[0xFF, 0xD8, 0xFF, marker]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// An APP1 Exif payload with a big-endian TIFF header and a fake GPS tag.
pub fn exif_payload() -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(b"MM\0\x2a\0\0\0\x08");
    payload.extend_from_slice(b"GPS 37.7749N 122.4194W");
    payload
}

/// An APP1 Exif payload holding only an Orientation tag (0x0112).
pub fn orientation_exif(orientation: u16) -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    // Big-endian TIFF header, first IFD at offset 8
    payload.extend_from_slice(b"MM\0\x2a\0\0\0\x08");
    // One entry: tag 0x0112, type SHORT, count 1, value padded to 4 bytes
    payload.extend_from_slice(&1u16.to_be_bytes());
    payload.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    payload.extend_from_slice(&orientation.to_be_bytes());
    payload.extend_from_slice(&[0, 0]);
    // No next IFD
    payload.extend_from_slice(&[0, 0, 0, 0]);
    payload
}
