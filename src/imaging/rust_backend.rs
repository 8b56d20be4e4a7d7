//! Pure Rust image processing backend built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF first frame) | `image::ImageReader::with_format`, then EXIF orientation applied |
//! | Render | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality 1–100) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (quality picks compression effort) |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` (quality picks quantizer speed) |
//!
//! A `DynamicImage` carries pixels only. EXIF, XMP, IPTC, ICC and text chunks
//! in the source never reach it, so nothing the encoders write can leak them.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeParams, MediaFormat, Quality};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, PngEncoder};
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageEncoder, ImageReader};
use std::io::Cursor;

/// Default cap on a render surface: 64 megapixels of RGBA.
pub const DEFAULT_MAX_SURFACE_BYTES: u64 = 64 * 1024 * 1024 * 4;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    max_surface_bytes: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            max_surface_bytes: DEFAULT_MAX_SURFACE_BYTES,
        }
    }

    /// Limit the RGBA byte size of any surface this backend will allocate.
    pub fn with_max_surface_bytes(max_surface_bytes: u64) -> Self {
        Self { max_surface_bytes }
    }

    /// Check that a `target`-sized RGBA surface can be allocated.
    fn acquire_surface(&self, target: Dimensions) -> Result<(), BackendError> {
        if target.width == 0 || target.height == 0 {
            return Err(BackendError::Surface(format!("empty surface {target}")));
        }
        let bytes = (target.width as u64)
            .checked_mul(target.height as u64)
            .and_then(|px| px.checked_mul(4))
            .ok_or_else(|| BackendError::Surface(format!("surface {target} overflows")))?;
        if bytes > self.max_surface_bytes {
            return Err(BackendError::Surface(format!(
                "surface {target} needs {bytes} bytes, limit is {}",
                self.max_surface_bytes
            )));
        }
        Ok(())
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Read dimensions from an encoded blob's header without a full decode.
pub fn read_dimensions(bytes: &[u8], format: MediaFormat) -> Result<Dimensions, BackendError> {
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format.to_image_format())
        .into_dimensions()
        .map_err(|e| BackendError::Decode(format!("Failed to read {format} header: {e}")))?;
    Ok(Dimensions { width, height })
}

/// PNG is lossless: lower quality buys smaller files through more effort.
fn png_compression(quality: Quality) -> CompressionType {
    match quality.value() {
        81.. => CompressionType::Fast,
        51..=80 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// GIF quantizer speed: 1 is the best palette, 30 the coarsest.
fn gif_speed(quality: Quality) -> i32 {
    1 + (100u32.saturating_sub(quality.value()) * 29 / 100) as i32
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    // JPEG has no alpha channel; it is dropped here.
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.value() as u8)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(buf)
}

fn encode_png(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgba = img.to_rgba8();
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(
        &mut buf,
        png_compression(quality),
        image::codecs::png::FilterType::Adaptive,
    )
    .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
    .map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
    Ok(buf)
}

fn encode_gif(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgba = img.to_rgba8();
    let mut buf = Vec::new();
    {
        // The trailer is written when the encoder drops.
        let mut encoder = GifEncoder::new_with_speed(&mut buf, gif_speed(quality));
        encoder
            .encode(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
            .map_err(|e| BackendError::Encode(format!("GIF encode failed: {e}")))?;
    }
    Ok(buf)
}

impl ImageBackend for RustBackend {
    type Raster = DynamicImage;

    /// Decode and turn the pixels upright.
    ///
    /// The EXIF Orientation tag does not survive re-encoding, so it is applied
    /// here; otherwise sideways-stored phone photos would come out rotated.
    fn decode(&self, bytes: &[u8], format: MediaFormat) -> Result<DynamicImage, BackendError> {
        let decode_err =
            |e: image::ImageError| BackendError::Decode(format!("Failed to decode {format}: {e}"));
        let mut decoder = ImageReader::with_format(Cursor::new(bytes), format.to_image_format())
            .into_decoder()
            .map_err(decode_err)?;
        // A malformed Exif block is not worth failing the image over
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
        img.apply_orientation(orientation);
        Ok(img)
    }

    fn dimensions(&self, raster: &DynamicImage) -> Dimensions {
        Dimensions {
            width: raster.width(),
            height: raster.height(),
        }
    }

    fn render(
        &self,
        source: &DynamicImage,
        target: Dimensions,
    ) -> Result<DynamicImage, BackendError> {
        self.acquire_surface(target)?;
        if self.dimensions(source) == target {
            return Ok(source.clone());
        }
        Ok(source.resize_exact(target.width, target.height, FilterType::Lanczos3))
    }

    fn encode(
        &self,
        surface: &DynamicImage,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError> {
        match params.format {
            MediaFormat::Jpeg => encode_jpeg(surface, params.quality),
            MediaFormat::Png => encode_png(surface, params.quality),
            MediaFormat::Gif => encode_gif(surface, params.quality),
        }
    }
}
