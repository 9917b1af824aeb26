//! Label mask construction from labelled vector polygons.

pub mod builder;
pub mod polygons;

pub use builder::{apply_mask, build_mask};
pub use polygons::{LabeledPolygon, LoadSummary, PolygonSet};
