//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations the sanitizer needs:
//! decode a source blob, render it onto a fresh surface at a target size, and
//! encode that surface. The search never touches pixels directly, so tests can
//! run it against a mock that synthesizes encoded sizes.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::{EncodeParams, MediaFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Surface unavailable: {0}")]
    Surface(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Pixel dimensions of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn longer_edge(self) -> u32 {
        self.width.max(self.height)
    }

    pub fn shorter_edge(self) -> u32 {
        self.width.min(self.height)
    }

    /// Width over height.
    pub fn aspect(self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// A `Raster` is an in-memory pixel buffer with no metadata attached. Decoding
/// produces one; rendering produces a new one at the requested size. Backends
/// hold no per-call state, so one instance is shared across concurrent
/// sanitize calls.
pub trait ImageBackend: Send + Sync {
    type Raster: Send + 'static;

    /// Decode an encoded blob into pixels.
    fn decode(&self, bytes: &[u8], format: MediaFormat) -> Result<Self::Raster, BackendError>;

    /// Pixel dimensions of a raster.
    fn dimensions(&self, raster: &Self::Raster) -> Dimensions;

    /// Render `source` onto a freshly allocated surface of `target` size.
    fn render(&self, source: &Self::Raster, target: Dimensions)
    -> Result<Self::Raster, BackendError>;

    /// Serialize a surface.
    fn encode(&self, surface: &Self::Raster, params: &EncodeParams)
    -> Result<Vec<u8>, BackendError>;
}
