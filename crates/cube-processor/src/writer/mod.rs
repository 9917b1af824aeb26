//! Container serialization of assembled cubes in Zarr V3 format.

mod reader;
mod zarr_writer;

pub use reader::ContainerReader;
pub use zarr_writer::{
    slab_path, ContainerWriteResult, ContainerWriter, ALTITUDE_PATH, BANDS_ATTRIBUTE, MASK_PATH,
    META_ATTRIBUTE, TIME_STEPS_ATTRIBUTE,
};
