//! Parse errors for the textual forms of the common types.

use thiserror::Error;

/// Errors raised when a CRS, transform, band code, label or time step
/// cannot be parsed from its canonical string.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("Invalid affine transform: {0}")]
    InvalidTransform(String),

    #[error("Unknown band code: {0}")]
    UnknownBand(String),

    #[error("Unknown potential class: {0}")]
    UnknownClass(String),

    #[error("Invalid time step: {0}")]
    InvalidTimeStep(String),

    #[error("Unknown pixel type: {0}")]
    UnknownPixelType(String),
}
