//! Coordinate reference system transformations.
//!
//! Wraps the pure-Rust `proj4rs` engine with the `crs-definitions` EPSG
//! database so rasters and polygons can be moved between any two EPSG-coded
//! CRSs without a native PROJ installation.

pub mod registry;
pub mod transform;

pub use registry::{is_geographic, proj_string};
pub use transform::CrsTransform;

use cube_common::Crs;
use thiserror::Error;

/// Errors raised while building or applying a CRS transformation.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("{0} is not in the EPSG definitions database")]
    UnknownCrs(Crs),

    #[error("invalid projection definition for {crs}: {message}")]
    InvalidDefinition { crs: Crs, message: String },

    #[error("transform from {from} to {to} failed at ({x}, {y}): {message}")]
    TransformFailed {
        from: Crs,
        to: Crs,
        x: f64,
        y: f64,
        message: String,
    },
}
