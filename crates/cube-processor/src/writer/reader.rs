//! Reader for containers written by [`ContainerWriter`](super::ContainerWriter).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use cube_common::{Band, GridDescriptor, PixelType, RasterMeta, TimeStep};
use zarrs::array::{Array, ElementOwned};
use zarrs::array_subset::ArraySubset;
use zarrs::group::Group;
use zarrs_filesystem::FilesystemStore;

use super::zarr_writer::{
    container_err, slab_path, ALTITUDE_PATH, BANDS_ATTRIBUTE, MASK_PATH, META_ATTRIBUTE,
    TIME_STEPS_ATTRIBUTE,
};
use crate::error::{CubeError, Result};
use crate::types::{Cube, LabelMask, RasterLayer, TimeStepSlab};

/// Read access to a cube container.
pub struct ContainerReader {
    store: Arc<FilesystemStore>,
    meta: RasterMeta,
    time_steps: Vec<TimeStep>,
    bands: Vec<String>,
}

impl ContainerReader {
    /// Open a container and parse its root attributes.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(CubeError::io(format!("{}: no container", path.display())));
        }
        let store = Arc::new(FilesystemStore::new(path).map_err(container_err)?);
        let root = Group::open(store.clone(), "/").map_err(container_err)?;
        let attrs = root.attributes();

        let meta_text = attrs
            .get(META_ATTRIBUTE)
            .and_then(|v| v.as_str())
            .ok_or_else(|| CubeError::container("root group has no meta attribute"))?;
        let meta = RasterMeta::from_json_str(meta_text)?;

        let time_steps = attrs
            .get(TIME_STEPS_ATTRIBUTE)
            .and_then(|v| v.as_array())
            .ok_or_else(|| CubeError::container("root group has no time_steps attribute"))?
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| CubeError::container("time step key is not a string"))?
                    .parse::<TimeStep>()
                    .map_err(container_err)
            })
            .collect::<Result<Vec<_>>>()?;

        let bands = attrs
            .get(BANDS_ATTRIBUTE)
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        Ok(Self {
            store,
            meta,
            time_steps,
            bands,
        })
    }

    pub fn meta(&self) -> &RasterMeta {
        &self.meta
    }

    pub fn time_steps(&self) -> &[TimeStep] {
        &self.time_steps
    }

    /// Slab channel names as recorded in the container.
    pub fn bands(&self) -> &[String] {
        &self.bands
    }

    /// Grid rebuilt from the metadata record.
    pub fn grid(&self) -> Result<GridDescriptor> {
        Ok(GridDescriptor {
            crs: self.meta.parsed_crs()?,
            transform: self.meta.parsed_transform()?,
            width: self.meta.width,
            height: self.meta.height,
            pixel_type: self.meta.dtype.parse::<PixelType>()?,
            nodata: self.meta.nodata,
        })
    }

    pub fn read_altitude(&self) -> Result<RasterLayer> {
        let data = self.read_elements::<f32>(ALTITUDE_PATH, 2)?;
        Ok(RasterLayer::new(data, self.meta.width, self.meta.height))
    }

    pub fn read_mask(&self) -> Result<LabelMask> {
        let data = self.read_elements::<bool>(MASK_PATH, 2)?;
        Ok(LabelMask {
            data,
            width: self.meta.width,
            height: self.meta.height,
        })
    }

    pub fn read_slab(&self, step: TimeStep) -> Result<TimeStepSlab> {
        if !self.time_steps.contains(&step) {
            return Err(CubeError::container(format!("no slab for {}", step)));
        }
        let data = self.read_elements::<f32>(&slab_path(step), 3)?;
        Ok(TimeStepSlab {
            data,
            width: self.meta.width,
            height: self.meta.height,
        })
    }

    /// Load the whole cube back into memory.
    pub fn read_cube(&self) -> Result<Cube> {
        let mut slabs = BTreeMap::new();
        for &step in &self.time_steps {
            slabs.insert(step, self.read_slab(step)?);
        }

        Ok(Cube {
            grid: self.grid()?,
            meta: self.meta.clone(),
            elevation: self.read_altitude()?,
            mask: self.read_mask()?,
            slabs,
        })
    }

    fn read_elements<T: ElementOwned>(&self, path: &str, ndim: usize) -> Result<Vec<T>> {
        let array = Array::open(self.store.clone(), path).map_err(container_err)?;

        let shape = array.shape().to_vec();
        let expected: Vec<u64> = match ndim {
            2 => vec![self.meta.height as u64, self.meta.width as u64],
            _ => vec![
                self.meta.height as u64,
                self.meta.width as u64,
                Band::SLAB_BAND_COUNT as u64,
            ],
        };
        if shape != expected {
            return Err(CubeError::container(format!(
                "{} has shape {:?}, expected {:?}",
                path, shape, expected
            )));
        }

        let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)
            .map_err(container_err)?;
        array
            .retrieve_array_subset_elements::<T>(&subset)
            .map_err(container_err)
    }
}
