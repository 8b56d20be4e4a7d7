//! Upload sanitization: strip metadata and fit a byte budget.
//!
//! [`Sanitizer::sanitize`] is a linear async chain with three suspension
//! points:
//!
//! ```text
//! load bytes (tokio::fs)  →  decode (blocking pool)  →  render + search (blocking pool)
//! ```
//!
//! Each call owns its decoded raster and every surface it renders. The
//! backend is shared behind an `Arc` and holds no per-call state. A
//! semaphore caps how many calls hold source bytes or rasters at once
//! (one per CPU by default), so a large batch cannot exhaust memory.
//!
//! Metadata never survives: pixels are decoded into a bare raster and
//! re-encoded from scratch, so EXIF/XMP/IPTC segments in the source have
//! nowhere to go. The segments found in the source are reported on the
//! result as [`SanitizedImage::stripped`].
//!
//! [`Sanitizer::sanitize_all`] drives a batch concurrently up to that cap,
//! keeps input order, and fails on the first error without partial results.

use crate::imaging::{
    BackendError, Budget, Dimensions, ImageBackend, MediaFormat, MetadataSegment, OutputFormat,
    Quality, RustBackend, SearchPolicy, scan_metadata, search_encoding,
};
use futures::future::try_join_all;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::{self, JoinError};
use tracing::info;

#[derive(Error, Debug)]
pub enum SanitizeError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode {0}")]
    Decode(String),
    #[error("No rendering surface for {0}")]
    Surface(String),
    #[error("Failed to encode {0}")]
    Encode(String),
    #[error("Image task did not complete: {0}")]
    Task(#[from] JoinError),
    #[error("Sanitizer is shut down: {0}")]
    Closed(#[from] AcquireError),
}

impl SanitizeError {
    fn from_backend(name: &str, err: BackendError) -> Self {
        match err {
            BackendError::Decode(msg) => SanitizeError::Decode(format!("{name}: {msg}")),
            BackendError::Surface(msg) => SanitizeError::Surface(format!("{name}: {msg}")),
            BackendError::Encode(msg) => SanitizeError::Encode(format!("{name}: {msg}")),
        }
    }
}

/// Where a source image's bytes come from.
#[derive(Debug, Clone)]
pub enum SourceData {
    Bytes(Vec<u8>),
    /// Read when the sanitize call runs.
    Path(PathBuf),
}

impl SourceData {
    async fn load(self) -> Result<Vec<u8>, SanitizeError> {
        match self {
            SourceData::Bytes(bytes) => Ok(bytes),
            SourceData::Path(path) => {
                // The output keeps the file name, which must survive unchanged
                if path.file_name().is_some_and(|n| n.to_str().is_none()) {
                    let source = std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "file name is not valid UTF-8",
                    );
                    return Err(SanitizeError::Read { path, source });
                }
                tokio::fs::read(&path)
                    .await
                    .map_err(|source| SanitizeError::Read { path, source })
            }
        }
    }
}

/// An image as the user picked it: bytes, declared type and file name.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub name: String,
    pub media_type: Option<String>,
    pub data: SourceData,
}

impl SourceImage {
    pub fn from_bytes(name: impl Into<String>, media_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.map(str::to_string),
            data: SourceData::Bytes(bytes),
        }
    }

    /// Source read lazily from `path`; the name is the path's file name.
    ///
    /// A file name that is not valid UTF-8 fails the sanitize call with
    /// [`SanitizeError::Read`] rather than being altered.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            media_type: None,
            data: SourceData::Path(path),
        }
    }
}

/// A metadata-free image that fits the budget, or the search floor.
#[derive(Debug, Clone)]
pub struct SanitizedImage {
    /// Original file name, unchanged even when the format changes.
    pub name: String,
    pub format: MediaFormat,
    pub data: Vec<u8>,
    pub modified: SystemTime,
    pub dimensions: Dimensions,
    pub quality: Quality,
    pub attempts: u32,
    /// False when the search floor was reached above `max_bytes`.
    pub within_budget: bool,
    pub source_format: MediaFormat,
    pub source_dimensions: Dimensions,
    pub source_bytes: u64,
    /// Metadata segments present in the source and absent from `data`.
    pub stripped: Vec<MetadataSegment>,
}

impl SanitizedImage {
    pub fn media_type(&self) -> &'static str {
        self.format.media_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Limits, output format and search ladder for a sanitize call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SanitizeOptions {
    pub budget: Budget,
    pub output: OutputFormat,
    pub policy: SearchPolicy,
}

impl SanitizeOptions {
    pub fn new(max_bytes: u64, max_dimension: u32) -> Self {
        Self {
            budget: Budget {
                max_bytes,
                max_dimension,
            },
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }
}

/// Number of images processed at once unless configured otherwise.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

/// Runs sanitize calls against a shared, stateless backend.
///
/// Clones share both the backend and the concurrency cap.
pub struct Sanitizer<B = RustBackend> {
    backend: Arc<B>,
    permits: Arc<Semaphore>,
}

impl<B> Clone for Sanitizer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            permits: Arc::clone(&self.permits),
        }
    }
}

impl Sanitizer<RustBackend> {
    pub fn new() -> Self {
        Self::with_backend(Arc::new(RustBackend::new()))
    }
}

impl Default for Sanitizer<RustBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ImageBackend + 'static> Sanitizer<B> {
    pub fn with_backend(backend: Arc<B>) -> Self {
        Self {
            backend,
            permits: Arc::new(Semaphore::new(default_concurrency())),
        }
    }

    /// Allow at most `limit` images in flight (at least one).
    ///
    /// The cap applies to this sanitizer and its clones.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(limit.clamp(1, Semaphore::MAX_PERMITS)));
        self
    }

    /// Strip metadata from `source` and re-encode it within `options`.
    pub async fn sanitize(
        &self,
        source: SourceImage,
        options: &SanitizeOptions,
    ) -> Result<SanitizedImage, SanitizeError> {
        let SourceImage {
            name,
            media_type,
            data,
        } = source;

        // Held until the result is built: covers the read, decode and search
        let _permit = self.permits.acquire().await?;
        let bytes = data.load().await?;
        let source_format = MediaFormat::resolve(media_type.as_deref(), &name, &bytes)
            .ok_or_else(|| SanitizeError::Decode(format!("{name}: not a JPEG, PNG or GIF image")))?;
        let stripped = scan_metadata(&bytes);
        let source_bytes = bytes.len() as u64;

        let backend = Arc::clone(&self.backend);
        let decoded = task::spawn_blocking(move || backend.decode(&bytes, source_format))
            .await?
            .map_err(|e| SanitizeError::from_backend(&name, e))?;

        let format = options.output.resolve(source_format);
        let SanitizeOptions { budget, policy, .. } = *options;
        let backend = Arc::clone(&self.backend);
        let (source_dimensions, outcome) = task::spawn_blocking(move || {
            let dimensions = backend.dimensions(&decoded);
            search_encoding(&*backend, &decoded, format, &budget, &policy)
                .map(|outcome| (dimensions, outcome))
        })
        .await?
        .map_err(|e| SanitizeError::from_backend(&name, e))?;

        let accepted = outcome.accepted;
        info!(
            name = %name,
            from = %source_dimensions,
            to = %accepted.dimensions,
            quality = accepted.quality.value(),
            bytes = accepted.data.len(),
            attempts = outcome.attempts,
            stripped = stripped.len(),
            "sanitized"
        );

        Ok(SanitizedImage {
            name,
            format,
            data: accepted.data,
            modified: SystemTime::now(),
            dimensions: accepted.dimensions,
            quality: accepted.quality,
            attempts: outcome.attempts,
            within_budget: outcome.within_budget,
            source_format,
            source_dimensions,
            source_bytes,
            stripped,
        })
    }

    /// Sanitize every source concurrently, preserving order.
    ///
    /// At most the configured number of images are in flight at once. The
    /// first failure aborts the batch; no partial results are returned.
    pub async fn sanitize_all(
        &self,
        sources: Vec<SourceImage>,
        options: &SanitizeOptions,
    ) -> Result<Vec<SanitizedImage>, SanitizeError> {
        try_join_all(
            sources
                .into_iter()
                .map(|source| self.sanitize(source, options)),
        )
        .await
    }
}

/// Sanitize one image with the default backend.
pub async fn sanitize(
    source: SourceImage,
    options: &SanitizeOptions,
) -> Result<SanitizedImage, SanitizeError> {
    Sanitizer::new().sanitize(source, options).await
}

/// Sanitize a batch with the default backend. Fails on the first error.
pub async fn sanitize_all(
    sources: Vec<SourceImage>,
    options: &SanitizeOptions,
) -> Result<Vec<SanitizedImage>, SanitizeError> {
    Sanitizer::new().sanitize_all(sources, options).await
}
