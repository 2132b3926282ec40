//! Coarse-to-fine convolutional classifier with saliency-driven patch
//! extraction and feature splicing.
//!
//! A coarse stack classifies a downsampled view of the image and yields a
//! saliency map from the gradient of its prediction entropy. High-resolution
//! patches are cropped at the most salient locations, run through a fine
//! stack, and spliced back into the coarse feature map before the final
//! classification. A hint loss ties the fine features to the coarse features
//! they replace.

mod common;
pub mod geometry;
pub mod loss;
pub mod model;
pub mod patch;
pub mod pipeline;
pub mod saliency;
pub mod splice;

pub use loss::*;
pub use pipeline::*;
