//! Layer and loss building blocks for the coarse-to-fine classifier.

mod batch_norm;
mod common;
mod conv_bn_2d;
mod cross_entropy;
mod hint_loss;
mod linear_bn;

pub use batch_norm::*;
pub use conv_bn_2d::*;
pub use cross_entropy::*;
pub use hint_loss::*;
pub use linear_bn::*;
