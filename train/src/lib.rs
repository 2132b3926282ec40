mod common;
pub mod config;
mod train;

pub use crate::train::start;
