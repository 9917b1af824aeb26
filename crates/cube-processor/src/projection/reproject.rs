//! Reprojection of a source raster onto a target grid.

use cube_common::GridDescriptor;
use projection::CrsTransform;
use tracing::{debug, warn};

use super::{nearest_interpolate, ResamplingMethod};
use crate::error::{CubeError, Result};
use crate::types::RasterLayer;

/// Resample `source` (laid out on `source_grid`) onto `target_grid`.
///
/// Each target pixel centre is mapped into the source CRS and then into
/// source pixel space; the source pixel containing that point is copied.
/// A target pixel is NaN when the point falls outside the source extent,
/// when the source value is NaN or equal to the source nodata value, or
/// when the point lies outside the domain of the CRS transformation.
///
/// # Errors
/// `Reprojection` when either CRS is unknown, when the source transform
/// cannot be inverted, when either grid has a zero dimension, or when no
/// target pixel centre could be mapped into the source CRS.
pub fn reproject(
    source: &RasterLayer,
    source_grid: &GridDescriptor,
    target_grid: &GridDescriptor,
    method: ResamplingMethod,
) -> Result<RasterLayer> {
    if target_grid.width == 0 || target_grid.height == 0 {
        return Err(CubeError::reprojection("target grid has a zero dimension"));
    }
    if source_grid.width == 0 || source_grid.height == 0 {
        return Err(CubeError::reprojection("source grid has a zero dimension"));
    }
    if source.shape() != source_grid.shape() {
        return Err(CubeError::reprojection(format!(
            "source layer {}x{} does not match its grid {}x{}",
            source.width, source.height, source_grid.width, source_grid.height
        )));
    }

    let to_source = CrsTransform::new(target_grid.crs, source_grid.crs)?;
    let inverse = source_grid.transform.inverse().ok_or_else(|| {
        CubeError::reprojection(format!(
            "source transform [{}] is not invertible",
            source_grid.transform
        ))
    })?;

    let nodata = source_grid.nodata.filter(|v| !v.is_nan()).map(|v| v as f32);

    let mut output = vec![f32::NAN; target_grid.len()];
    let mut failed_points = 0usize;

    for row in 0..target_grid.height {
        for col in 0..target_grid.width {
            let (x, y) = target_grid.pixel_center(col, row);

            let Ok((sx, sy)) = to_source.transform(x, y) else {
                failed_points += 1;
                continue;
            };
            let (src_col, src_row) = inverse.apply(sx, sy);

            let value = match method {
                ResamplingMethod::Nearest => nearest_interpolate(
                    &source.data,
                    source.width,
                    source.height,
                    src_col,
                    src_row,
                ),
            };

            if value.is_nan() || nodata == Some(value) {
                continue;
            }
            output[row * target_grid.width + col] = value;
        }
    }

    if failed_points == target_grid.len() {
        return Err(CubeError::reprojection(format!(
            "no pixel of the {}x{} target grid could be transformed from {} to {}",
            target_grid.width, target_grid.height, target_grid.crs, source_grid.crs
        )));
    }
    if failed_points > 0 {
        warn!(
            from = %source_grid.crs,
            to = %target_grid.crs,
            failed_points,
            total = target_grid.len(),
            "Some target pixels fall outside the transformation domain"
        );
    }

    debug!(
        from = %source_grid.crs,
        to = %target_grid.crs,
        width = target_grid.width,
        height = target_grid.height,
        failed_points,
        "Reprojected raster"
    );

    Ok(RasterLayer::new(output, target_grid.width, target_grid.height))
}

#[cfg(test)]
mod tests {
    use cube_common::{Crs, GeoTransform, PixelType};

    use super::*;

    fn grid(crs: Crs, transform: GeoTransform, width: usize, height: usize) -> GridDescriptor {
        GridDescriptor {
            crs,
            transform,
            width,
            height,
            pixel_type: PixelType::Float32,
            nodata: None,
        }
    }

    #[test]
    fn test_identity_reprojection_copies_values() {
        let g = grid(Crs::epsg(32631), GeoTransform::from_origin(0.0, 30.0, 10.0, 10.0), 3, 3);
        let layer = RasterLayer::new((0..9).map(|v| v as f32).collect(), 3, 3);

        let out = reproject(&layer, &g, &g, ResamplingMethod::Nearest).unwrap();
        assert_eq!(out, layer);
    }

    #[test]
    fn test_upsampling_same_crs() {
        // 2x2 source at 20 m onto a 4x4 target at 10 m over the same extent
        let src = grid(Crs::epsg(32631), GeoTransform::from_origin(0.0, 40.0, 20.0, 20.0), 2, 2);
        let dst = grid(Crs::epsg(32631), GeoTransform::from_origin(0.0, 40.0, 10.0, 10.0), 4, 4);
        let layer = RasterLayer::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2);

        let out = reproject(&layer, &src, &dst, ResamplingMethod::Nearest).unwrap();
        assert_eq!(
            out.data,
            vec![
                1.0, 1.0, 2.0, 2.0, //
                1.0, 1.0, 2.0, 2.0, //
                3.0, 3.0, 4.0, 4.0, //
                3.0, 3.0, 4.0, 4.0,
            ]
        );
    }

    #[test]
    fn test_outside_extent_and_nodata_are_nan() {
        let mut src = grid(Crs::epsg(32631), GeoTransform::from_origin(0.0, 20.0, 10.0, 10.0), 2, 2);
        src.nodata = Some(-9999.0);
        // Target shifted one pixel right: its last column falls outside the source
        let dst = grid(Crs::epsg(32631), GeoTransform::from_origin(10.0, 20.0, 10.0, 10.0), 2, 2);
        let layer = RasterLayer::new(vec![1.0, -9999.0, f32::NAN, 4.0], 2, 2);

        let out = reproject(&layer, &src, &dst, ResamplingMethod::Nearest).unwrap();
        assert!(out.data[0].is_nan(), "nodata must become NaN");
        assert!(out.data[1].is_nan(), "outside extent must be NaN");
        assert_eq!(out.data[2], 4.0);
        assert!(out.data[3].is_nan());
    }

    #[test]
    fn test_zero_dimension_target_is_rejected() {
        let src = grid(Crs::epsg(32631), GeoTransform::from_origin(0.0, 20.0, 10.0, 10.0), 2, 2);
        let dst = grid(Crs::epsg(32631), GeoTransform::from_origin(0.0, 20.0, 10.0, 10.0), 0, 2);
        let layer = RasterLayer::new(vec![0.0; 4], 2, 2);
        let err = reproject(&layer, &src, &dst, ResamplingMethod::Nearest).unwrap_err();
        assert!(matches!(err, CubeError::Reprojection(_)));
    }

    #[test]
    fn test_unknown_crs_is_rejected() {
        let src = grid(Crs::epsg(1), GeoTransform::from_origin(0.0, 20.0, 10.0, 10.0), 2, 2);
        let dst = grid(Crs::epsg(32631), GeoTransform::from_origin(0.0, 20.0, 10.0, 10.0), 2, 2);
        let layer = RasterLayer::new(vec![0.0; 4], 2, 2);
        let err = reproject(&layer, &src, &dst, ResamplingMethod::Nearest).unwrap_err();
        assert!(matches!(err, CubeError::Reprojection(_)));
    }

    #[test]
    fn test_singular_transform_is_rejected() {
        let src = grid(Crs::epsg(32631), GeoTransform::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0), 2, 2);
        let dst = grid(Crs::epsg(32631), GeoTransform::from_origin(0.0, 20.0, 10.0, 10.0), 2, 2);
        let layer = RasterLayer::new(vec![0.0; 4], 2, 2);
        let err = reproject(&layer, &src, &dst, ResamplingMethod::Nearest).unwrap_err();
        assert!(matches!(err, CubeError::Reprojection(_)));
    }

    #[test]
    fn test_untransformable_target_is_rejected() {
        let src = grid(Crs::epsg(32631), GeoTransform::from_origin(0.0, 20.0, 10.0, 10.0), 2, 2);
        // Every target pixel centre is NaN, so no point survives the transform
        let dst = grid(Crs::WGS84, GeoTransform::from_origin(f64::NAN, f64::NAN, 0.01, 0.01), 2, 2);
        let layer = RasterLayer::new(vec![1.0; 4], 2, 2);
        let err = reproject(&layer, &src, &dst, ResamplingMethod::Nearest).unwrap_err();
        assert!(matches!(err, CubeError::Reprojection(_)));
    }

    #[test]
    fn test_geographic_source_onto_utm() {
        // Constant field over lon 3..4, lat 43..44 at 0.01 degrees
        let src = grid(Crs::WGS84, GeoTransform::from_origin(3.0, 44.0, 0.01, 0.01), 100, 100);
        let layer = RasterLayer::new(vec![250.0; 100 * 100], 100, 100);
        let dst = grid(
            Crs::epsg(32631),
            GeoTransform::from_origin(540000.0, 4828000.0, 100.0, 100.0),
            20,
            20,
        );

        let out = reproject(&layer, &src, &dst, ResamplingMethod::Nearest).unwrap();
        assert!(out.data.iter().all(|v| *v == 250.0));
    }
}
