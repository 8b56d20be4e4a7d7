//! High-level image operations.
//!
//! [`search_encoding`] combines the dimension calculations with backend
//! execution: it renders the decoded source at a bounded size, then walks
//! down the quality/dimension ladder until an encoding fits the byte budget.
//!
//! ```text
//! render at fit_within(original, max_dimension), quality = initial
//! loop:
//!     encode
//!     size <= max_bytes                  → accept
//!     quality > floor                    → quality -= step
//!     longer edge > dimension floor      → shrink, re-render, quality = reset
//!     otherwise                          → accept over budget (floor reached)
//! ```
//!
//! Quality is lowered before dimensions because it degrades the picture more
//! gracefully. Both floors bound the number of attempts.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{fit_within, shrink};
use super::params::{EncodeParams, MediaFormat, Quality};
use tracing::{debug, warn};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Byte and dimension limits for one sanitized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_bytes: u64,
    pub max_dimension: u32,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_bytes: 4 * 1024 * 1024,
            max_dimension: 1920,
        }
    }
}

/// The quality/dimension ladder walked by [`search_encoding`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchPolicy {
    /// Quality of the first attempt.
    pub initial_quality: Quality,
    /// Percentage points removed per quality step.
    pub quality_step: u32,
    /// Quality at or below which dimensions shrink instead.
    pub quality_floor: Quality,
    /// Quality restored after each shrink.
    pub reset_quality: Quality,
    /// Multiplier applied to the longer edge on each shrink.
    pub shrink_factor: f64,
    /// Longer edge never shrinks below this; reaching it ends the search.
    pub dimension_floor: u32,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            initial_quality: Quality::new(92),
            quality_step: 10,
            quality_floor: Quality::new(30),
            reset_quality: Quality::new(70),
            shrink_factor: 0.8,
            dimension_floor: 800,
        }
    }
}

/// One encoded candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingAttempt {
    pub dimensions: Dimensions,
    pub quality: Quality,
    pub data: Vec<u8>,
}

/// The accepted attempt and how the search got there.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub accepted: EncodingAttempt,
    /// Number of encodes performed, including the accepted one.
    pub attempts: u32,
    /// False only when the floor was reached with the output still too large.
    pub within_budget: bool,
}

/// Search for the largest, highest-quality encoding of `source` that fits
/// `budget`.
///
/// Every surface is rendered from `source` itself, never from a previous
/// surface, so shrinking does not compound resampling loss.
pub fn search_encoding<B: ImageBackend>(
    backend: &B,
    source: &B::Raster,
    format: MediaFormat,
    budget: &Budget,
    policy: &SearchPolicy,
) -> Result<SearchOutcome> {
    let original = backend.dimensions(source);
    let mut dimensions = fit_within(original, budget.max_dimension);
    let mut surface = backend.render(source, dimensions)?;
    let mut quality = policy.initial_quality;
    let mut attempts = 0u32;

    loop {
        let data = backend.encode(&surface, &EncodeParams { format, quality })?;
        attempts += 1;
        debug!(
            %dimensions,
            quality = quality.value(),
            bytes = data.len(),
            max_bytes = budget.max_bytes,
            "encode attempt {attempts}"
        );

        let accepted = |data, within_budget| SearchOutcome {
            accepted: EncodingAttempt {
                dimensions,
                quality,
                data,
            },
            attempts,
            within_budget,
        };

        if data.len() as u64 <= budget.max_bytes {
            return Ok(accepted(data, true));
        }
        // Each step must make progress, whatever the policy says
        let lower = quality.step_down(policy.quality_step);
        if quality > policy.quality_floor && lower < quality {
            quality = lower;
            continue;
        }
        if dimensions.longer_edge() > policy.dimension_floor {
            let next = shrink(
                original,
                dimensions,
                policy.shrink_factor,
                policy.dimension_floor,
            );
            if next.longer_edge() < dimensions.longer_edge() {
                dimensions = next;
                surface = backend.render(source, dimensions)?;
                quality = policy.reset_quality;
                continue;
            }
        }

        warn!(
            %dimensions,
            quality = quality.value(),
            bytes = data.len(),
            max_bytes = budget.max_bytes,
            "search floor reached; accepting over-budget encoding"
        );
        return Ok(accepted(data, false));
    }
}
