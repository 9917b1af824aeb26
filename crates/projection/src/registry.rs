//! EPSG lookups against the bundled definitions database.

use cube_common::Crs;

/// PROJ.4 definition string for a CRS, if the database knows it.
pub fn proj_string(crs: Crs) -> Option<&'static str> {
    crs_definitions::from_code(crs.code()).map(|def| def.proj4)
}

/// Whether a CRS is geographic (lon/lat in degrees).
///
/// Falls back to the EPSG 4000-4999 range when the code is not in the
/// database.
pub fn is_geographic(crs: Crs) -> bool {
    match proj_string(crs) {
        Some(def) => def.contains("+proj=longlat") || def.contains("+proj=latlong"),
        None => (4000..5000).contains(&crs.code()),
    }
}
