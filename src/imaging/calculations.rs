//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Every size is derived from the *original* dimensions, not from the previous
//! step, so repeated shrinking never accumulates rounding drift in the aspect
//! ratio.

use super::backend::Dimensions;

/// Scale `original` so its longer edge equals `longer`, preserving aspect ratio.
///
/// The shorter edge is rounded and never drops below 1px.
///
/// # Examples
/// ```
/// # use upload_scrub::imaging::{Dimensions, scale_to_longer_edge};
/// // 6000x4000 landscape → 1920x1280
/// assert_eq!(
///     scale_to_longer_edge(Dimensions::new(6000, 4000), 1920),
///     Dimensions::new(1920, 1280)
/// );
/// ```
pub fn scale_to_longer_edge(original: Dimensions, longer: u32) -> Dimensions {
    let longer = longer.max(1);
    let Dimensions { width, height } = original;

    if width >= height {
        // Landscape or square
        let ratio = longer as f64 / width as f64;
        Dimensions::new(longer, ((height as f64 * ratio).round() as u32).max(1))
    } else {
        // Portrait
        let ratio = longer as f64 / height as f64;
        Dimensions::new(((width as f64 * ratio).round() as u32).max(1), longer)
    }
}

/// Initial target dimensions: bound the longer edge to `max_edge`.
///
/// Images already within the bound keep their original size (no upscaling).
pub fn fit_within(original: Dimensions, max_edge: u32) -> Dimensions {
    if original.longer_edge() > max_edge {
        scale_to_longer_edge(original, max_edge)
    } else {
        original
    }
}

/// Shrink `current` by `factor`, with the longer edge floored at `floor`.
///
/// The result is computed from `original` to keep its aspect ratio. Callers
/// only shrink while the longer edge is above `floor`, so each call makes
/// the image strictly smaller.
pub fn shrink(original: Dimensions, current: Dimensions, factor: f64, floor: u32) -> Dimensions {
    let longer = current.longer_edge();
    let target = ((longer as f64 * factor).round() as u32).max(floor).min(longer);
    scale_to_longer_edge(original, target)
}
