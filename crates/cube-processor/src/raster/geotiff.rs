//! Single-band GeoTIFF decoding.
//!
//! Georeferencing comes from the standard GeoTIFF tags: the affine transform
//! from `ModelTransformationTag`, or from `ModelPixelScaleTag` plus
//! `ModelTiepointTag`; the CRS from the projected or geographic type key of
//! the `GeoKeyDirectoryTag`; nodata from GDAL's ASCII `GDAL_NODATA` tag.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use cube_common::{Crs, GeoTransform, GridDescriptor, PixelType};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::error::{CubeError, Result};
use crate::raster::SourceRaster;
use crate::types::RasterLayer;

// GeoKey IDs
pub(crate) const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
pub(crate) const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
pub(crate) const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
pub(crate) const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

/// Decode a GeoTIFF file into a source raster.
pub fn read_geotiff(path: &Path) -> Result<SourceRaster> {
    let file = File::open(path)
        .map_err(|e| CubeError::io(format!("{}: {}", path.display(), e)))?;

    decode(BufReader::new(file)).map_err(|e| match e {
        CubeError::Io(msg) => CubeError::io(format!("{}: {}", path.display(), msg)),
        CubeError::Format(msg) => CubeError::format(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Decode a GeoTIFF from any seekable reader.
pub fn decode<R: Read + Seek>(reader: R) -> Result<SourceRaster> {
    let mut decoder = Decoder::new(reader).map_err(not_a_tiff)?;

    let (width, height) = decoder.dimensions()?;
    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => {
            return Err(CubeError::format(format!(
                "expected a single-band raster, found {:?}",
                other
            )))
        }
    }

    let transform = read_transform(&mut decoder)?;
    let crs = read_crs(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?;

    let (data, pixel_type) = widen(decoder.read_image()?)?;

    let (width, height) = (width as usize, height as usize);
    if data.len() != width * height {
        return Err(CubeError::format(format!(
            "decoded {} samples for a {}x{} raster",
            data.len(),
            width,
            height
        )));
    }

    let grid = GridDescriptor {
        crs,
        transform,
        width,
        height,
        pixel_type,
        nodata,
    };

    Ok(SourceRaster {
        layer: RasterLayer::new(data, width, height),
        grid,
    })
}

/// A decoder that cannot even parse the header means the file is not a TIFF,
/// which is reported as unreadable rather than malformed.
fn not_a_tiff(err: tiff::TiffError) -> CubeError {
    match err {
        tiff::TiffError::IoError(e) => CubeError::io(e.to_string()),
        other => CubeError::io(format!("not a TIFF file: {}", other)),
    }
}

fn widen(result: DecodingResult) -> Result<(Vec<f32>, PixelType)> {
    let widened = match result {
        DecodingResult::U8(buf) => (buf.into_iter().map(|v| v as f32).collect(), PixelType::Uint8),
        DecodingResult::U16(buf) => {
            (buf.into_iter().map(|v| v as f32).collect(), PixelType::Uint16)
        }
        DecodingResult::U32(buf) => {
            (buf.into_iter().map(|v| v as f32).collect(), PixelType::Uint32)
        }
        DecodingResult::I8(buf) => (buf.into_iter().map(|v| v as f32).collect(), PixelType::Int8),
        DecodingResult::I16(buf) => {
            (buf.into_iter().map(|v| v as f32).collect(), PixelType::Int16)
        }
        DecodingResult::I32(buf) => {
            (buf.into_iter().map(|v| v as f32).collect(), PixelType::Int32)
        }
        DecodingResult::F32(buf) => (buf, PixelType::Float32),
        DecodingResult::F64(buf) => {
            (buf.into_iter().map(|v| v as f32).collect(), PixelType::Float64)
        }
        _ => return Err(CubeError::format("unsupported sample type")),
    };
    Ok(widened)
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let Some(value) = decoder.find_tag(Tag::ModelTransformationTag)? {
        let m = value.into_f64_vec()?;
        if m.len() < 8 {
            return Err(CubeError::format("ModelTransformationTag has fewer than 8 values"));
        }
        return Ok(GeoTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]));
    }

    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;

    match (scale, tiepoint) {
        (Some(s), Some(t)) if s.len() >= 2 && t.len() >= 6 => {
            let (sx, sy) = (s[0], s[1]);
            let (i, j, x, y) = (t[0], t[1], t[3], t[4]);
            Ok(GeoTransform::new(sx, 0.0, x - i * sx, 0.0, -sy, y + j * sy))
        }
        _ => Err(CubeError::format("missing georeferencing (no transform tags)")),
    }
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Crs> {
    let keys = decoder
        .find_tag(Tag::GeoKeyDirectoryTag)?
        .ok_or_else(|| CubeError::format("missing GeoKeyDirectoryTag"))?
        .into_u16_vec()?;

    crs_from_geokeys(&keys).ok_or_else(|| CubeError::format("GeoKey directory has no EPSG code"))
}

/// Find the EPSG code in a GeoKey directory, preferring the projected key.
///
/// Only keys whose value is stored inline (location 0) are considered.
pub(crate) fn crs_from_geokeys(keys: &[u16]) -> Option<Crs> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;

    let mut projected = None;
    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(count) {
        let (id, location, value) = (entry[0], entry[1], entry[3]);
        // 32767 is the "user-defined" marker
        if location != 0 || value == 0 || value == 32767 {
            continue;
        }
        match id {
            PROJECTED_CS_TYPE_GEO_KEY => projected = Some(Crs::epsg(value)),
            GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(Crs::epsg(value)),
            _ => {}
        }
    }
    projected.or(geographic)
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    Ok(parse_nodata(&text))
}

pub(crate) fn parse_nodata(text: &str) -> Option<f64> {
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match text.to_lowercase().as_str() {
        "" => None,
        "nan" | "-nan" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geokeys_projected_preferred() {
        let keys = [
            1, 1, 0, 3, //
            1024, 0, 1, 1, //
            2048, 0, 1, 4326, //
            3072, 0, 1, 32631,
        ];
        assert_eq!(crs_from_geokeys(&keys), Some(Crs::epsg(32631)));
    }

    #[test]
    fn test_geokeys_geographic_only() {
        let keys = [1, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, 4326];
        assert_eq!(crs_from_geokeys(&keys), Some(Crs::WGS84));
    }

    #[test]
    fn test_geokeys_user_defined_is_ignored() {
        let keys = [1, 1, 0, 1, 3072, 0, 1, 32767];
        assert_eq!(crs_from_geokeys(&keys), None);
        assert_eq!(crs_from_geokeys(&[1, 1]), None);
    }

    #[test]
    fn test_parse_nodata() {
        assert_eq!(parse_nodata("0\0"), Some(0.0));
        assert_eq!(parse_nodata(" -9999 "), Some(-9999.0));
        assert!(parse_nodata("nan").unwrap().is_nan());
        assert_eq!(parse_nodata(""), None);
        assert_eq!(parse_nodata("none"), None);
    }
}
