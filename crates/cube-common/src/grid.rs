//! Grid descriptors and the persisted raster metadata record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::{Crs, GeoTransform};

/// Absolute tolerance used when comparing transforms of two grids.
pub const TRANSFORM_TOLERANCE: f64 = 1e-9;

/// Sample type of a source raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    Uint8,
    Uint16,
    Uint32,
    Int8,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl PixelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PixelType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uint8" => Ok(Self::Uint8),
            "uint16" => Ok(Self::Uint16),
            "uint32" => Ok(Self::Uint32),
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            _ => Err(ParseError::UnknownPixelType(s.to_string())),
        }
    }
}

/// Full description of a pixel grid: where every pixel sits and how the
/// source encoded its samples.
///
/// The first near-infrared band read by the assembler becomes the
/// *reference grid*; every layer in the cube conforms to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDescriptor {
    pub crs: Crs,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    pub pixel_type: PixelType,
    pub nodata: Option<f64>,
}

impl GridDescriptor {
    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Array shape as `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Map coordinates of the centre of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_center(col, row)
    }

    /// Describe why `other` does not sit on the same pixel grid, or `None`
    /// if both grids align (same CRS, dimensions and transform).
    ///
    /// Pixel type and nodata are not part of alignment.
    pub fn alignment_mismatch(&self, other: &GridDescriptor) -> Option<String> {
        if self.crs != other.crs {
            return Some(format!("CRS {} != {}", other.crs, self.crs));
        }
        if self.shape() != other.shape() {
            return Some(format!(
                "shape {}x{} != {}x{}",
                other.width, other.height, self.width, self.height
            ));
        }
        if !self.transform.approx_eq(&other.transform, TRANSFORM_TOLERANCE) {
            return Some(format!("transform [{}] != [{}]", other.transform, self.transform));
        }
        None
    }

    /// Whether `other` sits on the same pixel grid.
    pub fn is_aligned_with(&self, other: &GridDescriptor) -> bool {
        self.alignment_mismatch(other).is_none()
    }
}

/// Structured metadata record persisted alongside the cube.
///
/// Describes the reference grid's source raster with the field set raster
/// tooling commonly exposes (`driver, dtype, nodata, width, height, count,
/// crs, transform`). CRS and transform are stored as canonical strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMeta {
    pub driver: String,
    pub dtype: String,
    pub nodata: Option<f64>,
    pub width: usize,
    pub height: usize,
    pub count: usize,
    pub crs: String,
    pub transform: String,
}

impl RasterMeta {
    /// Build the record for a single-band source grid.
    ///
    /// A NaN nodata is recorded as `None` since JSON has no NaN literal.
    pub fn from_grid(grid: &GridDescriptor, driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            dtype: grid.pixel_type.as_str().to_string(),
            nodata: grid.nodata.filter(|v| !v.is_nan()),
            width: grid.width,
            height: grid.height,
            count: 1,
            crs: grid.crs.to_string(),
            transform: grid.transform.to_string(),
        }
    }

    /// Serialize to the textual form stored in the container.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the textual form back.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Parse the CRS field.
    pub fn parsed_crs(&self) -> Result<Crs, ParseError> {
        self.crs.parse()
    }

    /// Parse the transform field.
    pub fn parsed_transform(&self) -> Result<GeoTransform, ParseError> {
        self.transform.parse()
    }
}
