//! Common test fixtures: CRS codes, reference grids, GeoJSON polygons and
//! Sentinel-2 style file names.

use serde_json::{json, Value};

/// EPSG codes used across tests.
pub mod crs {
    /// WGS 84 geographic
    pub const WGS84: u16 = 4326;

    /// UTM zone 31N (Sentinel-2 tile T31TEJ)
    pub const UTM31N: u16 = 32631;
}

/// Reference grid definitions (upper-left corner, pixel size, shape).
pub mod grid {
    /// A small UTM 31N grid at 10 m.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct GridSpec {
        pub west: f64,
        pub north: f64,
        pub pixel_size: f64,
        pub width: usize,
        pub height: usize,
    }

    impl GridSpec {
        /// Map coordinates of pixel corner (col, row).
        pub fn corner(&self, col: usize, row: usize) -> (f64, f64) {
            (
                self.west + col as f64 * self.pixel_size,
                self.north - row as f64 * self.pixel_size,
            )
        }
    }

    /// 4x4 pixels at 10 m in UTM 31N.
    pub const UTM_4X4: GridSpec = GridSpec {
        west: 540000.0,
        north: 4828000.0,
        pixel_size: 10.0,
        width: 4,
        height: 4,
    };

    /// 20x20 pixels at 100 m in UTM 31N, inside lon 3..4, lat 43..44.
    pub const UTM_20X20: GridSpec = GridSpec {
        west: 540000.0,
        north: 4828000.0,
        pixel_size: 100.0,
        width: 20,
        height: 20,
    };
}

/// The five soil potential labels in their source spelling.
pub const LABELS: [&str; 5] = ["Limite", "Assez_limite", "Moyen", "Assez_fort", "Fort_a_tres_fort"];

/// A GeoJSON feature with an axis-aligned rectangle geometry.
pub fn rectangle_feature(x0: f64, y0: f64, x1: f64, y1: f64, label: &str) -> Value {
    json!({
        "type": "Feature",
        "properties": { "pot_global": label },
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
        }
    })
}

/// A feature collection text, with a legacy named `crs` member when `epsg`
/// is given.
pub fn feature_collection(features: Vec<Value>, epsg: Option<u16>) -> String {
    let mut collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    if let Some(code) = epsg {
        collection["crs"] = json!({
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", code) }
        });
    }
    collection.to_string()
}

/// Two polygons on `spec`: "Limite" over the top-left 2x2 pixel block and
/// "Fort_a_tres_fort" over the bottom-right 2x2 block, in the grid's CRS.
pub fn two_corner_blocks(spec: &grid::GridSpec, epsg: u16) -> String {
    let (x0, y0) = spec.corner(0, 2);
    let (x1, y1) = spec.corner(2, 0);
    let (x2, y2) = spec.corner(2, 4);
    let (x3, y3) = spec.corner(4, 2);

    feature_collection(
        vec![
            rectangle_feature(x0, y0, x1, y1, "Limite"),
            rectangle_feature(x2, y2, x3, y3, "Fort_a_tres_fort"),
        ],
        Some(epsg),
    )
}

/// Sentinel-2 L2A style file name, e.g. `T31TEJ_20190103T104431_B02_10m.tif`.
pub fn sentinel_tile_name(tile: &str, stamp: &str, band: &str) -> String {
    format!("{}_{}_{}_10m.tif", tile, stamp, band)
}
