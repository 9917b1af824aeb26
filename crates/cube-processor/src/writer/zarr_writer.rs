//! Zarr V3 writer for assembled cubes.
//!
//! Store layout:
//!
//! ```text
//! /            group, attributes: meta, time_steps, bands
//! /altitude    float32 [height, width]
//! /mask        bool    [height, width]
//! /<year>      group
//! /<year>/<MM> float32 [height, width, 5]
//! ```

use std::path::Path;
use std::sync::Arc;

use cube_common::{Band, TimeStep};
use tracing::{debug, info};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::codec::BytesToBytesCodecTraits;
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

use crate::config::{CubeConfig, ZarrCompression};
use crate::error::{CubeError, Result};
use crate::types::Cube;

pub const ALTITUDE_PATH: &str = "/altitude";
pub const MASK_PATH: &str = "/mask";

pub const META_ATTRIBUTE: &str = "meta";
pub const TIME_STEPS_ATTRIBUTE: &str = "time_steps";
pub const BANDS_ATTRIBUTE: &str = "bands";

/// Array path of a time-step slab, e.g. `/2019/03`.
pub fn slab_path(step: TimeStep) -> String {
    format!("/{}", step.storage_path())
}

fn year_path(year: i32) -> String {
    format!("/{}", year)
}

pub(crate) fn container_err(e: impl std::fmt::Display) -> CubeError {
    CubeError::container(e.to_string())
}

/// Summary of a written container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerWriteResult {
    pub arrays: usize,
    /// Uncompressed payload size.
    pub bytes_written: u64,
}

/// Writer for persisting a [`Cube`] as a Zarr V3 directory store.
pub struct ContainerWriter {
    config: CubeConfig,
}

impl ContainerWriter {
    pub fn new(config: CubeConfig) -> Self {
        Self { config }
    }

    /// Write `cube` to a directory store at `path`.
    ///
    /// A previous cube container at `path` is replaced. Any other non-empty
    /// directory, or a plain file, is left untouched and reported as a
    /// `Container` error. A write interrupted part way leaves an incomplete
    /// store that must be regenerated.
    pub fn write(&self, cube: &Cube, path: &Path) -> Result<ContainerWriteResult> {
        clear_target(path)?;
        std::fs::create_dir_all(path)?;

        let store = Arc::new(FilesystemStore::new(path).map_err(container_err)?);
        let (height, width) = cube.grid.shape();
        let mut result = ContainerWriteResult {
            arrays: 0,
            bytes_written: 0,
        };

        self.write_root_group(&store, cube)?;

        let shape_2d = vec![height as u64, width as u64];
        let altitude = self.build_array(
            &store,
            ALTITUDE_PATH,
            shape_2d.clone(),
            DataType::Float32,
            FillValue::from(f32::NAN),
            4,
        )?;
        store_elements(&altitude, &shape_2d, &cube.elevation.data)?;
        result.arrays += 1;
        result.bytes_written += (cube.elevation.data.len() * std::mem::size_of::<f32>()) as u64;

        let mask = self.build_array(
            &store,
            MASK_PATH,
            shape_2d.clone(),
            DataType::Bool,
            FillValue::from(false),
            1,
        )?;
        store_elements(&mask, &shape_2d, &cube.mask.data)?;
        result.arrays += 1;
        result.bytes_written += cube.mask.data.len() as u64;

        let shape_3d = vec![height as u64, width as u64, Band::SLAB_BAND_COUNT as u64];
        for (year, months) in cube.by_year() {
            GroupBuilder::new()
                .build(store.clone(), &year_path(year))
                .map_err(container_err)?
                .store_metadata()
                .map_err(container_err)?;

            for (month, slab) in months {
                let step = TimeStep { year, month };
                let array = self.build_array(
                    &store,
                    &slab_path(step),
                    shape_3d.clone(),
                    DataType::Float32,
                    FillValue::from(f32::NAN),
                    4,
                )?;
                store_elements(&array, &shape_3d, &slab.data)?;
                result.arrays += 1;
                result.bytes_written += (slab.data.len() * std::mem::size_of::<f32>()) as u64;
                debug!(step = %step, path = %slab_path(step), "Wrote slab");
            }
        }

        info!(
            path = %path.display(),
            arrays = result.arrays,
            bytes = result.bytes_written,
            compression = %self.config.zarr_compression,
            "Wrote container"
        );
        Ok(result)
    }

    fn write_root_group(&self, store: &Arc<FilesystemStore>, cube: &Cube) -> Result<()> {
        let time_steps: Vec<String> = cube.time_steps().iter().map(|s| s.to_string()).collect();

        let mut attrs = serde_json::Map::new();
        attrs.insert(
            META_ATTRIBUTE.to_string(),
            serde_json::json!(cube.meta.to_json_string()?),
        );
        attrs.insert(TIME_STEPS_ATTRIBUTE.to_string(), serde_json::json!(time_steps));
        attrs.insert(
            BANDS_ATTRIBUTE.to_string(),
            serde_json::json!(Band::SLAB_BAND_NAMES),
        );

        GroupBuilder::new()
            .attributes(attrs)
            .build(store.clone(), "/")
            .map_err(container_err)?
            .store_metadata()
            .map_err(container_err)
    }

    /// Build an array whose chunks span `zarr_chunk_size` pixels in both
    /// spatial dimensions and every band.
    fn build_array(
        &self,
        store: &Arc<FilesystemStore>,
        path: &str,
        shape: Vec<u64>,
        data_type: DataType,
        fill_value: FillValue,
        typesize: usize,
    ) -> Result<Array<FilesystemStore>> {
        let chunk = self.config.zarr_chunk_size as u64;
        let chunk_shape: Vec<u64> = shape
            .iter()
            .enumerate()
            .map(|(i, &dim)| if i < 2 { chunk.min(dim).max(1) } else { dim.max(1) })
            .collect();

        let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
            .try_into()
            .map_err(|e| CubeError::Config(format!("{:?}", e)))?;

        let mut builder = ArrayBuilder::new(shape, data_type, chunk_grid, fill_value);

        if self.config.zarr_compression != ZarrCompression::None {
            let codec = self.create_compression_codec(typesize)?;
            builder.bytes_to_bytes_codecs(vec![codec]);
        }

        let array = builder.build(store.clone(), path).map_err(container_err)?;
        array.store_metadata().map_err(container_err)?;
        Ok(array)
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(&self, typesize: usize) -> Result<Arc<dyn BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.zarr_compression_level)
            .map_err(|_| CubeError::Config("invalid compression level".to_string()))?;

        let shuffle = if self.config.zarr_shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = self.config.zarr_shuffle.then_some(typesize);

        let compressor = match self.config.zarr_compression {
            ZarrCompression::None => {
                return Err(CubeError::Config("no compression configured".to_string()))
            }
            ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| CubeError::Config(e.to_string()))?;
        Ok(Arc::new(codec))
    }
}

/// Make `path` ready for a fresh store: remove it only when it holds a
/// previous cube container.
fn clear_target(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    if !path.is_dir() {
        return Err(CubeError::container(format!(
            "{} exists and is not a directory",
            path.display()
        )));
    }
    if is_cube_container(path) {
        debug!(path = %path.display(), "Removing existing container");
        std::fs::remove_dir_all(path)?;
        return Ok(());
    }
    if std::fs::read_dir(path)?.next().is_some() {
        return Err(CubeError::container(format!(
            "{} is a non-empty directory that is not a cube container",
            path.display()
        )));
    }
    Ok(())
}

/// A root `zarr.json` whose attributes carry the metadata record.
fn is_cube_container(path: &Path) -> bool {
    std::fs::read_to_string(path.join("zarr.json"))
        .ok()
        .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
        .map_or(false, |root| {
            root.get("attributes")
                .and_then(|attrs| attrs.get(META_ATTRIBUTE))
                .is_some()
        })
}

fn store_elements<T: zarrs::array::Element>(
    array: &Array<FilesystemStore>,
    shape: &[u64],
    data: &[T],
) -> Result<()> {
    let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape.to_vec())
        .map_err(container_err)?;
    array
        .store_array_subset_elements(&subset, data)
        .map_err(container_err)
}
