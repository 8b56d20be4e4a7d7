//! # Upload Scrub
//!
//! Prepares user-picked images for upload: strips every trace of metadata and
//! re-encodes the pixels until the file fits a byte budget.
//!
//! # Architecture: Decode Once, Render Many
//!
//! ```text
//! bytes ──decode──▶ raster ──render(fit max_dimension)──▶ surface ──encode(q)──▶ blob
//!                     │                                      ▲          │
//!                     └──────render(shrunk dimensions)───────┘    too large? lower q,
//!                                                                 then shrink
//! ```
//!
//! The decoded raster is kept for the whole search. Every surface is rendered
//! from it directly, so successive shrinks never resample an already
//! resampled image. Decoding applies the EXIF orientation, so phone photos
//! stored sideways come out upright. Encoding runs on tokio's blocking pool,
//! and a batch runs its images concurrently, as many at once as there are CPUs.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sanitize`] | `SourceImage` → `SanitizedImage`, single and batch, error mapping |
//! | [`imaging`] | Backend trait, `image`-crate backend, dimension math, the quality/size search, metadata scanning |
//! | [`config`] | `upload-scrub.toml` loading, validation, merging over stock defaults |
//! | [`inputs`] | Expands CLI path arguments (files and directories) into image paths |
//! | [`output`] | CLI report formatting, text and JSON |
//!
//! # Design Decisions
//!
//! ## Re-encoding Is the Metadata Stripper
//!
//! There is no EXIF editor here. The decoder yields bare pixels and the encoder
//! writes a fresh file, so nothing from the source container can survive. The
//! [`imaging::scan_metadata`] walker only *reports* what was dropped, and tests
//! use it to assert that sanitized output is clean.
//!
//! ## Quality Before Dimensions
//!
//! Lowering JPEG quality costs less visible detail than halving the pixel
//! count, so the search exhausts the quality ladder at each size before it
//! shrinks. Quality is an integer percentage: `92 → 82 → … → 22` is exact,
//! with no floating-point drift at the floor.
//!
//! ## Over-Budget Results Are Returned, Not Failed
//!
//! Some inputs (pure noise, for instance) do not fit the budget even at
//! 800px and quality 30. The floor result is returned with
//! [`SanitizedImage::within_budget`] set to `false`, and a `warn!` is logged.
//! The caller decides whether to upload it.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, Lanczos3 resampling and encoding all come from the `image`
//! crate, so the binary needs no system libraries.

pub mod config;
pub mod imaging;
pub mod inputs;
pub mod output;
pub mod sanitize;

pub use sanitize::{
    SanitizeError, SanitizeOptions, SanitizedImage, Sanitizer, SourceData, SourceImage, sanitize,
    sanitize_all,
};

#[cfg(test)]
pub(crate) mod test_helpers;
