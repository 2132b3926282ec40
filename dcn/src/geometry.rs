//! Receptive-field geometry of the coarse stack.
//!
//! The coarse stack is a 7x7 stride-2 valid convolution followed by a 3x3
//! stride-2 valid convolution, so coarse cell `x` sits over first-layer cell
//! `2x + 1` (the kernel center), which starts at input pixel `2*(2x + 1)`.
//! Adding the 7x7 kernel half-width (+3) reaches the receptive-field center;
//! backing off by 5 positions the fixed 14x14 crop window around it, and +2
//! compensates for the zero padding applied before extraction. The constants
//! must be re-derived whenever the coarse stack's kernel/stride composition
//! changes.

/// Splits a flattened spatial index of an `H x W` feature map into
/// `(row, col)`.
pub fn map_to_cell(flat_idx: i64, map_width: i64) -> (i64, i64) {
    (flat_idx / map_width, flat_idx % map_width)
}

/// Maps a flattened feature-map index to the pixel-space crop origin in the
/// padded input image, before any jitter margin is applied.
pub fn map_to_origin(flat_idx: i64, map_width: i64) -> (i64, i64) {
    let (row, col) = map_to_cell(flat_idx, map_width);
    (pixel_origin(row), pixel_origin(col))
}

/// Crop start for coarse cell `x`, applied identically to rows and columns.
pub fn pixel_origin(x: i64) -> i64 {
    2 * (2 * x + 1) + 3 - 5 + 2
}
