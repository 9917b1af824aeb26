//! Labelled multi-temporal raster cube builder.
//!
//! Aligns per-month Sentinel-2 band rasters and an elevation raster onto one
//! reference grid, keeps only pixels inside positively labelled polygons,
//! derives NDVI and persists everything in a single Zarr V3 container.
//!
//! # Pipeline
//!
//! ```text
//! TileIndex ──► RasterSource::open (per band, per time step)
//!                   │
//!                   ├─► first NIR band fixes the reference grid
//!                   │
//! PolygonSet ──► build_mask (once, on the reference grid)
//!                   │
//!                   ├─► per step: check grid, NDVI, apply_mask, stack 5 bands
//!                   │
//! elevation ───► reproject (nearest) ─► apply_mask
//!                   │
//!                   ▼
//!              Cube ─► ContainerWriter ─► /altitude, /mask, /<year>/<month>
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cube_processor::{ContainerWriter, CubeAssembler, CubeConfig, GeoTiffSource, PolygonSet};
//!
//! let config = CubeConfig::default();
//! let (polygons, _) = PolygonSet::from_geojson_file(geojson, &config.label_property)?;
//! let (cube, report) = CubeAssembler::new(&GeoTiffSource, &config)
//!     .assemble(&tiles, &polygons, elevation)?;
//! ContainerWriter::new(config).write(&cube, output)?;
//! ```

pub mod assembler;
pub mod config;
pub mod error;
pub mod mask;
pub mod projection;
pub mod raster;
pub mod tiles;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use assembler::{ndvi, AssemblyReport, AssemblyState, CubeAssembler, SkippedStep};
pub use config::{CubeConfig, ZarrCompression};
pub use error::{CubeError, Result};
pub use mask::{apply_mask, build_mask, LabeledPolygon, LoadSummary, PolygonSet};
pub use self::projection::{reproject, ResamplingMethod};
pub use raster::{GeoTiffSource, MemorySource, RasterSource, SampleEncoding, SourceRaster};
pub use tiles::TileIndex;
pub use types::{Cube, LabelMask, LayerStats, RasterLayer, TimeStepSlab};
pub use writer::{ContainerReader, ContainerWriteResult, ContainerWriter};
