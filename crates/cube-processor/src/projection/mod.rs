//! Resampling of rasters onto the reference grid.

pub mod interpolation;
pub mod reproject;

pub use interpolation::{nearest_interpolate, ResamplingMethod};
pub use reproject::reproject;
