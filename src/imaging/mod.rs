//! Image processing: pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, GIF first frame) |
//! | **Render** | `resize_exact` with Lanczos3 onto a fresh surface |
//! | **Encode** | `image` JPEG / PNG / GIF encoders |
//! | **Metadata scan** | custom segment walker (JPEG markers, PNG chunks, GIF extensions) |
//!
//! The module is split into:
//! - **Calculations**: pure functions for dimension math (unit testable)
//! - **Parameters**: data structures describing encode attempts
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: the quality/dimension search over a backend

pub mod backend;
mod calculations;
pub mod metadata_scan;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{fit_within, scale_to_longer_edge, shrink};
pub use metadata_scan::{MetadataKind, MetadataSegment, scan_metadata};
pub use operations::{Budget, EncodingAttempt, SearchOutcome, SearchPolicy, search_encoding};
pub use params::{EncodeParams, MediaFormat, OutputFormat, Quality};
pub use rust_backend::{RustBackend, read_dimensions};
