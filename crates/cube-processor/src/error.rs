//! Error types for cube processing.

use cube_common::{Band, TimeStep};
use thiserror::Error;

/// Errors that can occur while building or persisting a cube.
#[derive(Error, Debug)]
pub enum CubeError {
    /// A raster or vector file could not be read.
    #[error("I/O error: {0}")]
    Io(String),

    /// A raster does not match the single-band numeric GeoTIFF assumption,
    /// or a vector file is not valid GeoJSON.
    #[error("format error: {0}")]
    Format(String),

    /// Source and target grids cannot be aligned.
    #[error("reprojection error: {0}")]
    Reprojection(String),

    /// The polygon set yields no polygon for any positive label.
    #[error("mask error: {0}")]
    Mask(String),

    /// One band of one time step could not be read or is misaligned.
    #[error("band {band} of {step} unreadable: {reason}")]
    BandRead {
        step: TimeStep,
        band: Band,
        reason: String,
    },

    /// Zarr container write or read failure.
    #[error("container error: {0}")]
    Container(String),

    /// Invalid configuration or input index.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CubeError {
    /// Create an Io error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Create a Format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a Reprojection error.
    pub fn reprojection(msg: impl Into<String>) -> Self {
        Self::Reprojection(msg.into())
    }

    /// Create a Mask error.
    pub fn mask(msg: impl Into<String>) -> Self {
        Self::Mask(msg.into())
    }

    /// Create a BandRead error.
    pub fn band_read(step: TimeStep, band: Band, reason: impl Into<String>) -> Self {
        Self::BandRead {
            step,
            band,
            reason: reason.into(),
        }
    }

    /// Create a Container error.
    pub fn container(msg: impl Into<String>) -> Self {
        Self::Container(msg.into())
    }

    /// Whether a run may continue past this error.
    ///
    /// Only a band read failure is recoverable, and only outside the
    /// grid-establishing time step (the assembler decides that part).
    pub fn is_step_local(&self) -> bool {
        matches!(self, Self::BandRead { .. })
    }
}

impl From<std::io::Error> for CubeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CubeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Container(format!("metadata: {}", err))
    }
}

impl From<tiff::TiffError> for CubeError {
    fn from(err: tiff::TiffError) -> Self {
        match err {
            tiff::TiffError::IoError(e) => Self::Io(e.to_string()),
            other => Self::Format(other.to_string()),
        }
    }
}

impl From<projection::ProjectionError> for CubeError {
    fn from(err: projection::ProjectionError) -> Self {
        Self::Reprojection(err.to_string())
    }
}

impl From<cube_common::ParseError> for CubeError {
    fn from(err: cube_common::ParseError) -> Self {
        Self::Format(err.to_string())
    }
}

/// Result type for cube operations.
pub type Result<T> = std::result::Result<T, CubeError>;
