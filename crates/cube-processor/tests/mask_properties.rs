//! Mask and reprojection properties on a 20x20 UTM grid.

use cube_common::{Crs, GeoTransform, GridDescriptor, PixelType, PotentialClass};
use cube_processor::{apply_mask, build_mask, reproject, PolygonSet, RasterLayer, ResamplingMethod};
use projection::CrsTransform;
use serde_json::Value;
use test_utils::fixtures::grid::{GridSpec, UTM_20X20};
use test_utils::{
    assert_approx_eq, assert_bits_eq, create_elevation_grid, create_grid_with_nans,
    feature_collection, rectangle_feature, LABELS,
};

fn utm_grid(spec: &GridSpec) -> GridDescriptor {
    GridDescriptor {
        crs: Crs::epsg(32631),
        transform: GeoTransform::from_origin(spec.west, spec.north, spec.pixel_size, spec.pixel_size),
        width: spec.width,
        height: spec.height,
        pixel_type: PixelType::Uint16,
        nodata: Some(0.0),
    }
}

/// One overlapping pixel block per label, stepping down the diagonal.
fn diagonal_blocks() -> Vec<Value> {
    LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let (x0, y1) = UTM_20X20.corner(3 * i, 3 * i);
            let (x1, y0) = UTM_20X20.corner(3 * i + 5, 3 * i + 5);
            rectangle_feature(x0, y0, x1, y1, label)
        })
        .collect()
}

fn load(features: Vec<Value>, epsg: Option<u16>) -> PolygonSet {
    let (set, summary) =
        PolygonSet::from_geojson_str(&feature_collection(features, epsg), "pot_global").unwrap();
    assert_eq!(summary.unlabeled, 0);
    set
}

#[test]
fn test_mask_ignores_label_and_feature_order() {
    let grid = utm_grid(&UTM_20X20);
    let forward = load(diagonal_blocks(), Some(32631));
    let mut reversed_features = diagonal_blocks();
    reversed_features.reverse();
    let backward = load(reversed_features, Some(32631));

    let mut reversed_labels = PotentialClass::ALL.to_vec();
    reversed_labels.reverse();

    let reference = build_mask(&forward, &grid, &PotentialClass::ALL).unwrap();
    assert_eq!(build_mask(&forward, &grid, &reversed_labels).unwrap(), reference);
    assert_eq!(build_mask(&backward, &grid, &PotentialClass::ALL).unwrap(), reference);

    // Five 5x5 blocks, consecutive ones sharing a 2x2 corner
    assert_eq!(reference.count(), 5 * 25 - 4 * 4);
    assert!(reference.get(0, 0));
    assert!(reference.get(16, 16));
    assert!(!reference.get(19, 0));
}

#[test]
fn test_mask_subset_is_contained_in_full_mask() {
    let grid = utm_grid(&UTM_20X20);
    let polygons = load(diagonal_blocks(), Some(32631));

    let full = build_mask(&polygons, &grid, &PotentialClass::ALL).unwrap();
    let strong = build_mask(
        &polygons,
        &grid,
        &[PotentialClass::AssezFort, PotentialClass::FortATresFort],
    )
    .unwrap();

    assert!(strong.count() < full.count());
    for (s, f) in strong.data.iter().zip(&full.data) {
        assert!(!s || *f);
    }
}

#[test]
fn test_apply_mask_is_idempotent_and_propagates_nan() {
    let grid = utm_grid(&UTM_20X20);
    let mask = build_mask(&load(diagonal_blocks(), Some(32631)), &grid, &PotentialClass::ALL).unwrap();

    // Index 0 and 21 fall inside the first block, 19 outside every block
    let nan_indices = [0, 21, 19];
    let layer = RasterLayer::new(create_grid_with_nans(20, 20, 7.5, &nan_indices), 20, 20);

    let once = apply_mask(&layer, &mask);
    let twice = apply_mask(&once, &mask);
    assert_bits_eq!(&once.data, &twice.data);

    for (i, value) in once.data.iter().enumerate() {
        if nan_indices.contains(&i) || !mask.data[i] {
            assert!(value.is_nan(), "pixel {i} should be NaN");
        } else {
            assert_eq!(*value, 7.5);
        }
    }
}

#[test]
fn test_geographic_polygons_cover_projected_grid() {
    let grid = utm_grid(&UTM_20X20);
    // No crs member: coordinates are longitude/latitude
    let polygons = load(vec![rectangle_feature(3.0, 43.0, 4.0, 44.0, "Moyen")], None);
    assert_eq!(polygons.crs, Crs::WGS84);

    let mask = build_mask(&polygons, &grid, &[PotentialClass::Moyen]).unwrap();
    assert_eq!(mask.count(), 400);
}

#[test]
fn test_elevation_reprojected_by_nearest_source_pixel() {
    let source_grid = GridDescriptor {
        crs: Crs::WGS84,
        transform: GeoTransform::from_origin(3.0, 44.0, 0.01, 0.01),
        width: 100,
        height: 100,
        pixel_type: PixelType::Float32,
        nodata: None,
    };
    let source = RasterLayer::new(create_elevation_grid(100, 100, 0.0, 1000.0), 100, 100);
    let target = utm_grid(&UTM_20X20);

    let out = reproject(&source, &source_grid, &target, ResamplingMethod::Nearest).unwrap();
    assert_eq!(out.shape(), (20, 20));
    assert!(out.data.iter().all(|v| v.is_finite() && (0.0..=1000.0).contains(v)));

    let to_geographic = CrsTransform::new(target.crs, Crs::WGS84).unwrap();
    for (col, row) in [(0, 0), (10, 5), (19, 19)] {
        let (x, y) = target.pixel_center(col, row);
        let (lon, lat) = to_geographic.transform(x, y).unwrap();
        let src_col = ((lon - 3.0) / 0.01).floor() as usize;
        let src_row = ((44.0 - lat) / 0.01).floor() as usize;
        let expected = source.data[src_row * 100 + src_col];

        // Within one source pixel of the gradient
        assert_approx_eq!(out.get(col, row).unwrap(), expected, 1000.0 / 198.0 + 1e-3);
    }
}
