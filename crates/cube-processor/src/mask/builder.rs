//! Rasterization of labelled polygons into a boolean mask.

use cube_common::{GridDescriptor, PotentialClass};
use geo::{BoundingRect, Contains, Point};
use tracing::{debug, info};

use super::polygons::{LabeledPolygon, PolygonSet};
use crate::error::{CubeError, Result};
use crate::types::{LabelMask, RasterLayer};

/// Build the inclusion mask of `positive_labels` on `grid`.
///
/// Polygons are moved into the grid's CRS first. A pixel is included when
/// its centre lies strictly inside any polygon of a positive label; the
/// per-label masks are OR-ed, so the label order does not matter.
/// A centre exactly on a polygon edge is outside, whereas GDAL-style
/// rasterizers count left and top edges as inside.
///
/// # Errors
/// `Mask` when no polygon carries any of the positive labels, and
/// `Reprojection` when the polygons cannot be moved into the grid's CRS.
pub fn build_mask(
    polygons: &PolygonSet,
    grid: &GridDescriptor,
    positive_labels: &[PotentialClass],
) -> Result<LabelMask> {
    if !polygons.has_any_label(positive_labels) {
        let labels: Vec<&str> = positive_labels.iter().map(|l| l.label()).collect();
        return Err(CubeError::mask(format!(
            "no polygon carries any of the labels [{}]",
            labels.join(", ")
        )));
    }

    let polygons = polygons.reprojected(grid.crs)?;
    let to_pixel = grid.transform.inverse().ok_or_else(|| {
        CubeError::reprojection(format!("grid transform [{}] is not invertible", grid.transform))
    })?;

    let mut combined = LabelMask::new(grid.width, grid.height);
    for &label in positive_labels {
        let mut label_mask = LabelMask::new(grid.width, grid.height);
        for polygon in polygons.with_label(label) {
            rasterize(polygon, grid, &to_pixel, &mut label_mask);
        }
        debug!(label = %label, pixels = label_mask.count(), "Rasterized label");
        combined.union_with(&label_mask);
    }

    info!(
        pixels = combined.count(),
        total = grid.len(),
        polygons = polygons.len(),
        "Built label mask"
    );
    Ok(combined)
}

/// Mark every pixel of `grid` whose centre lies inside `polygon`.
fn rasterize(
    polygon: &LabeledPolygon,
    grid: &GridDescriptor,
    to_pixel: &cube_common::GeoTransform,
    mask: &mut LabelMask,
) {
    let Some(rect) = polygon.geometry.bounding_rect() else {
        return;
    };

    // Pixel window covering the polygon's bounds
    let (min, max) = (rect.min(), rect.max());
    let corners = [
        to_pixel.apply(min.x, min.y),
        to_pixel.apply(min.x, max.y),
        to_pixel.apply(max.x, min.y),
        to_pixel.apply(max.x, max.y),
    ];
    let (mut col_min, mut row_min) = (f64::INFINITY, f64::INFINITY);
    let (mut col_max, mut row_max) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (c, r) in corners {
        col_min = col_min.min(c);
        col_max = col_max.max(c);
        row_min = row_min.min(r);
        row_max = row_max.max(r);
    }

    if col_max < 0.0 || row_max < 0.0 || col_min >= grid.width as f64 || row_min >= grid.height as f64
    {
        return;
    }

    let col_start = col_min.floor().max(0.0) as usize;
    let row_start = row_min.floor().max(0.0) as usize;
    let col_end = (col_max.ceil() as usize).min(grid.width);
    let row_end = (row_max.ceil() as usize).min(grid.height);

    for row in row_start..row_end {
        for col in col_start..col_end {
            if mask.get(col, row) {
                continue;
            }
            let (x, y) = grid.pixel_center(col, row);
            if polygon.geometry.contains(&Point::new(x, y)) {
                mask.set(col, row);
            }
        }
    }
}

/// Copy of `layer` with NaN wherever `mask` is false.
///
/// Panics if the shapes differ.
pub fn apply_mask(layer: &RasterLayer, mask: &LabelMask) -> RasterLayer {
    assert_eq!(layer.shape(), mask.shape(), "mask and layer shapes differ");

    let data = layer
        .data
        .iter()
        .zip(&mask.data)
        .map(|(&v, &keep)| if keep { v } else { f32::NAN })
        .collect();
    RasterLayer::new(data, layer.width, layer.height)
}
