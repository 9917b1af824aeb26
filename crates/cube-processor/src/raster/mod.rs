//! Raster source adapter.
//!
//! A [`RasterSource`] turns a path into pixels plus the grid they sit on.
//! [`GeoTiffSource`] reads files from disk; [`MemorySource`] serves
//! pre-built rasters so the assembler can be driven without files.

mod geotiff;
pub mod geotiff_writer;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cube_common::GridDescriptor;
use tracing::debug;

pub use geotiff::{decode, read_geotiff};
pub use geotiff_writer::{write_geotiff, SampleEncoding};

use crate::error::{CubeError, Result};
use crate::types::RasterLayer;

/// A decoded single-band raster.
#[derive(Debug, Clone)]
pub struct SourceRaster {
    pub layer: RasterLayer,
    pub grid: GridDescriptor,
}

impl SourceRaster {
    /// Copy of the pixels with every value equal to the grid's nodata
    /// replaced by NaN.
    pub fn nodata_as_nan(&self) -> RasterLayer {
        let Some(nodata) = self.grid.nodata.filter(|v| !v.is_nan()) else {
            return self.layer.clone();
        };
        let nodata = nodata as f32;

        let data = self
            .layer
            .data
            .iter()
            .map(|&v| if v == nodata { f32::NAN } else { v })
            .collect();
        RasterLayer::new(data, self.layer.width, self.layer.height)
    }
}

/// Something that can open a raster by path.
pub trait RasterSource {
    fn open(&self, path: &Path) -> Result<SourceRaster>;
}

/// Reads single-band GeoTIFF files.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoTiffSource;

impl RasterSource for GeoTiffSource {
    fn open(&self, path: &Path) -> Result<SourceRaster> {
        let raster = read_geotiff(path)?;
        debug!(
            path = %path.display(),
            width = raster.grid.width,
            height = raster.grid.height,
            crs = %raster.grid.crs,
            dtype = %raster.grid.pixel_type,
            "Opened raster"
        );
        Ok(raster)
    }
}

/// In-memory rasters keyed by path.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    rasters: HashMap<PathBuf, SourceRaster>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, raster: SourceRaster) {
        self.rasters.insert(path.into(), raster);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, path: impl Into<PathBuf>, raster: SourceRaster) -> Self {
        self.insert(path, raster);
        self
    }
}

impl RasterSource for MemorySource {
    fn open(&self, path: &Path) -> Result<SourceRaster> {
        self.rasters
            .get(path)
            .cloned()
            .ok_or_else(|| CubeError::io(format!("{}: no such raster", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use cube_common::{Crs, GeoTransform, PixelType};

    use super::*;

    fn raster(nodata: Option<f64>) -> SourceRaster {
        SourceRaster {
            layer: RasterLayer::new(vec![0.0, 5.0, 0.0, 7.0], 2, 2),
            grid: GridDescriptor {
                crs: Crs::epsg(32631),
                transform: GeoTransform::from_origin(0.0, 20.0, 10.0, 10.0),
                width: 2,
                height: 2,
                pixel_type: PixelType::Uint16,
                nodata,
            },
        }
    }

    #[test]
    fn test_nodata_as_nan() {
        let layer = raster(Some(0.0)).nodata_as_nan();
        assert!(layer.data[0].is_nan());
        assert_eq!(layer.data[1], 5.0);
        assert!(layer.data[2].is_nan());

        assert_eq!(raster(None).nodata_as_nan().data, vec![0.0, 5.0, 0.0, 7.0]);
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new().with("a.tif", raster(None));
        assert!(source.open(Path::new("a.tif")).is_ok());
        assert!(matches!(
            source.open(Path::new("b.tif")),
            Err(CubeError::Io(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = GeoTiffSource.open(Path::new("/nonexistent/B08.tif")).unwrap_err();
        assert!(matches!(err, CubeError::Io(_)));
    }

    #[test]
    fn test_non_tiff_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not.tif");
        std::fs::write(&path, b"definitely not a tiff").unwrap();
        let err = GeoTiffSource.open(&path).unwrap_err();
        assert!(matches!(err, CubeError::Io(_)), "{err}");
    }
}
