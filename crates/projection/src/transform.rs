//! Point transformation between two CRSs.

use std::fmt;

use cube_common::Crs;
use proj4rs::proj::Proj;

use crate::registry::{is_geographic, proj_string};
use crate::ProjectionError;

/// A prepared transformation from one CRS to another.
///
/// Both definitions are parsed once at construction, so building a
/// transform is where an incompatible CRS pair is detected. Applying it to
/// individual points is cheap and may still fail for points outside the
/// target projection's domain.
pub struct CrsTransform {
    from: Crs,
    to: Crs,
    /// `None` when source and target are the same CRS.
    projs: Option<(Proj, Proj)>,
    from_geographic: bool,
    to_geographic: bool,
}

impl CrsTransform {
    /// Prepare a transformation from `from` to `to`.
    pub fn new(from: Crs, to: Crs) -> Result<Self, ProjectionError> {
        let from_geographic = is_geographic(from);
        let to_geographic = is_geographic(to);

        if from == to {
            return Ok(Self {
                from,
                to,
                projs: None,
                from_geographic,
                to_geographic,
            });
        }

        let source = load_proj(from)?;
        let target = load_proj(to)?;

        Ok(Self {
            from,
            to,
            projs: Some((source, target)),
            from_geographic,
            to_geographic,
        })
    }

    /// Whether this transform leaves coordinates untouched.
    pub fn is_identity(&self) -> bool {
        self.projs.is_none()
    }

    /// Transform one point. Geographic coordinates are in degrees (x = lon).
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        let Some((source, target)) = &self.projs else {
            return Ok((x, y));
        };

        // proj4rs works in radians for geographic coordinates
        let mut point = if self.from_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(source, target, &mut point).map_err(|e| {
            ProjectionError::TransformFailed {
                from: self.from,
                to: self.to,
                x,
                y,
                message: format!("{:?}", e),
            }
        })?;

        let (out_x, out_y) = if self.to_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(ProjectionError::TransformFailed {
                from: self.from,
                to: self.to,
                x,
                y,
                message: "non-finite result".to_string(),
            });
        }

        Ok((out_x, out_y))
    }
}

impl fmt::Debug for CrsTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrsTransform")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("identity", &self.is_identity())
            .finish()
    }
}

fn load_proj(crs: Crs) -> Result<Proj, ProjectionError> {
    let definition = proj_string(crs).ok_or(ProjectionError::UnknownCrs(crs))?;
    Proj::from_proj_string(definition).map_err(|e| ProjectionError::InvalidDefinition {
        crs,
        message: format!("{:?}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTM31N: Crs = Crs::epsg(32631);

    #[test]
    fn test_identity() {
        let t = CrsTransform::new(UTM31N, UTM31N).unwrap();
        assert!(t.is_identity());
        assert_eq!(t.transform(500000.0, 4800000.0).unwrap(), (500000.0, 4800000.0));
    }

    #[test]
    fn test_central_meridian_maps_to_false_easting() {
        // UTM 31N central meridian is 3°E, false easting 500 km
        let t = CrsTransform::new(Crs::WGS84, UTM31N).unwrap();
        let (x, y) = t.transform(3.0, 0.0).unwrap();
        assert!((x - 500000.0).abs() < 1e-3, "x = {}", x);
        assert!(y.abs() < 1e-3, "y = {}", y);
    }

    #[test]
    fn test_roundtrip_herault() {
        let forward = CrsTransform::new(Crs::WGS84, UTM31N).unwrap();
        let inverse = CrsTransform::new(UTM31N, Crs::WGS84).unwrap();

        let (x, y) = forward.transform(3.5, 43.6).unwrap();
        assert!(x > 530000.0 && x < 550000.0, "x = {}", x);
        assert!(y > 4820000.0 && y < 4840000.0, "y = {}", y);

        let (lon, lat) = inverse.transform(x, y).unwrap();
        assert!((lon - 3.5).abs() < 1e-7);
        assert!((lat - 43.6).abs() < 1e-7);
    }

    #[test]
    fn test_unknown_crs_is_rejected() {
        let err = CrsTransform::new(Crs::epsg(1), UTM31N).unwrap_err();
        assert!(matches!(err, ProjectionError::UnknownCrs(_)));
    }
}
