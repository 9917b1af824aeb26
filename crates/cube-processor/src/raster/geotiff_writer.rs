//! GeoTIFF writer for single-band layers.
//!
//! Used to export the masked elevation layer and to produce fixtures.
//! Pure Rust (no GDAL); georeferencing is written as pixel scale plus
//! tiepoint for north-up grids and as a full model transformation otherwise.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use cube_common::GridDescriptor;
use tiff::encoder::colortype::{ColorType, Gray16, Gray32Float, Gray8};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

use super::geotiff::{
    GEOGRAPHIC_TYPE_GEO_KEY, GT_MODEL_TYPE_GEO_KEY, GT_RASTER_TYPE_GEO_KEY,
    PROJECTED_CS_TYPE_GEO_KEY,
};
use crate::error::{CubeError, Result};
use crate::types::RasterLayer;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Sample encoding of the written file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SampleEncoding {
    #[default]
    Float32,
    /// Values are rounded and clamped to 0..=65535; NaN becomes nodata or 0.
    Uint16,
    /// Values are rounded and clamped to 0..=255; NaN becomes nodata or 0.
    Uint8,
}

/// Write `layer` on `grid` as a single-band GeoTIFF.
///
/// `grid.nodata` is written to `GDAL_NODATA` when set.
pub fn write_geotiff(
    path: &Path,
    layer: &RasterLayer,
    grid: &GridDescriptor,
    encoding: SampleEncoding,
) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| CubeError::io(format!("{}: {}", path.display(), e)))?;
    encode(BufWriter::new(file), layer, grid, encoding)
}

/// Encode into any seekable writer.
pub fn encode<W: Write + Seek>(
    writer: W,
    layer: &RasterLayer,
    grid: &GridDescriptor,
    encoding: SampleEncoding,
) -> Result<()> {
    if layer.width == 0 || layer.height == 0 {
        return Err(CubeError::format("raster has zero dimensions"));
    }
    if layer.shape() != grid.shape() {
        return Err(CubeError::format(format!(
            "layer {}x{} does not match grid {}x{}",
            layer.width, layer.height, grid.width, grid.height
        )));
    }

    let mut encoder = TiffEncoder::new(writer)?;
    let fill = grid.nodata.filter(|v| v.is_finite()).unwrap_or(0.0);

    match encoding {
        SampleEncoding::Float32 => write_image::<_, Gray32Float>(&mut encoder, grid, &layer.data),
        SampleEncoding::Uint16 => {
            let data: Vec<u16> = layer
                .data
                .iter()
                .map(|&v| quantize(v, fill, u16::MAX as f64) as u16)
                .collect();
            write_image::<_, Gray16>(&mut encoder, grid, &data)
        }
        SampleEncoding::Uint8 => {
            let data: Vec<u8> = layer
                .data
                .iter()
                .map(|&v| quantize(v, fill, u8::MAX as f64) as u8)
                .collect();
            write_image::<_, Gray8>(&mut encoder, grid, &data)
        }
    }
}

fn quantize(v: f32, fill: f64, max: f64) -> f64 {
    let v = if v.is_finite() { v as f64 } else { fill };
    v.round().clamp(0.0, max)
}

fn write_image<W, C>(
    encoder: &mut TiffEncoder<W>,
    grid: &GridDescriptor,
    data: &[C::Inner],
) -> Result<()>
where
    W: Write + Seek,
    C: ColorType,
    [C::Inner]: tiff::encoder::TiffValue,
{
    let mut image = encoder.new_image::<C>(grid.width as u32, grid.height as u32)?;
    write_geotiff_tags(image.encoder(), grid)?;
    image.write_data(data)?;
    Ok(())
}

fn write_geotiff_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    grid: &GridDescriptor,
) -> Result<()> {
    let t = &grid.transform;

    if t.is_rectilinear() && t.a > 0.0 && t.e < 0.0 {
        // ModelPixelScale: [ScaleX, ScaleY, ScaleZ]
        let pixel_scale = [t.a, -t.e, 0.0];
        dir.write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])?;

        // ModelTiepoint: pixel (0, 0) at the grid origin
        let tiepoint = [0.0, 0.0, 0.0, t.c, t.f, 0.0];
        dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    } else {
        #[rustfmt::skip]
        let matrix = [
            t.a, t.b, 0.0, t.c,
            t.d, t.e, 0.0, t.f,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        dir.write_tag(Tag::ModelTransformationTag, &matrix[..])?;
    }

    let geokeys = build_geokey_directory(grid);
    dir.write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;

    if let Some(nodata) = grid.nodata {
        let text = if nodata.is_nan() {
            "nan".to_string()
        } else {
            nodata.to_string()
        };
        dir.write_tag(Tag::GdalNodata, text.as_str())?;
    }

    Ok(())
}

fn build_geokey_directory(grid: &GridDescriptor) -> Vec<u16> {
    let geographic = projection::is_geographic(grid.crs);

    // [KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys, keys...]
    let mut keys = vec![1, 1, 0, 3];
    keys.extend_from_slice(&[
        GT_MODEL_TYPE_GEO_KEY,
        0,
        1,
        if geographic {
            MODEL_TYPE_GEOGRAPHIC
        } else {
            MODEL_TYPE_PROJECTED
        },
    ]);
    keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);

    let crs_key = if geographic {
        GEOGRAPHIC_TYPE_GEO_KEY
    } else {
        PROJECTED_CS_TYPE_GEO_KEY
    };
    keys.extend_from_slice(&[crs_key, 0, 1, grid.crs.code()]);
    keys
}
