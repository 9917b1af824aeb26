//! Common types shared across the label cube crates.
//!
//! Everything that describes *where* a pixel sits (CRS, affine transform,
//! grid descriptor) and *what* a layer holds (band, label class, time step)
//! lives here so the processor, the projection layer and the binary agree on
//! one vocabulary.

pub mod band;
pub mod crs;
pub mod error;
pub mod grid;
pub mod time;
pub mod transform;

pub use band::{Band, PotentialClass};
pub use crs::Crs;
pub use error::ParseError;
pub use grid::{GridDescriptor, PixelType, RasterMeta};
pub use time::TimeStep;
pub use transform::GeoTransform;
