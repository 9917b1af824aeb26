//! Affine pixel-to-map transforms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Affine transform mapping pixel (col, row) to map (x, y):
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
///
/// Coefficient names follow the common raster convention where `c`/`f` are
/// the coordinates of the upper-left corner of pixel (0, 0) and `a`/`e` the
/// pixel sizes (`e` negative for north-up rasters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up transform from the upper-left corner and pixel sizes.
    pub fn from_origin(west: f64, north: f64, x_size: f64, y_size: f64) -> Self {
        Self::new(x_size, 0.0, west, 0.0, -y_size, north)
    }

    /// Map coordinates of a fractional pixel position.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Map coordinates of the centre of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Inverse transform (map → pixel), or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<GeoTransform> {
        let det = self.a * self.e - self.b * self.d;
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let ia = self.e / det;
        let ib = -self.b / det;
        let id = -self.d / det;
        let ie = self.a / det;

        Some(Self::new(
            ia,
            ib,
            -(ia * self.c + ib * self.f),
            id,
            ie,
            -(id * self.c + ie * self.f),
        ))
    }

    /// Whether this transform has no rotation/shear terms.
    pub fn is_rectilinear(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    /// Compare coefficients with an absolute tolerance.
    pub fn approx_eq(&self, other: &GeoTransform, tolerance: f64) -> bool {
        self.coefficients()
            .iter()
            .zip(other.coefficients().iter())
            .all(|(x, y)| (x - y).abs() <= tolerance)
    }

    /// Coefficients in `[a, b, c, d, e, f]` order.
    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

/// Canonical string form: the six coefficients, comma separated.
/// Floats use the shortest representation that parses back exactly.
impl fmt::Display for GeoTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}

impl FromStr for GeoTransform {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseError::InvalidTransform(s.to_string()))?;

        match values.as_slice() {
            [a, b, c, d, e, f] => Ok(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => Err(ParseError::InvalidTransform(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_center() {
        let t = GeoTransform::from_origin(500000.0, 4800000.0, 10.0, 10.0);
        assert_eq!(t.pixel_center(0, 0), (500005.0, 4799995.0));
        assert_eq!(t.pixel_center(3, 2), (500035.0, 4799975.0));
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = GeoTransform::from_origin(3.0, 44.0, 0.25, 0.5);
        let inv = t.inverse().unwrap();
        let (x, y) = t.apply(7.0, 3.0);
        let (col, row) = inv.apply(x, y);
        assert!((col - 7.0).abs() < 1e-9);
        assert!((row - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_singular_has_no_inverse() {
        let t = GeoTransform::new(0.0, 0.0, 1.0, 0.0, 0.0, 1.0);
        assert!(t.inverse().is_none());
    }

    #[test]
    fn test_string_roundtrip_is_exact() {
        let t = GeoTransform::new(10.0, 0.0, 499980.0, 0.0, -10.0, 4900020.0);
        assert_eq!(t.to_string(), "10,0,499980,0,-10,4900020");

        let odd = GeoTransform::from_origin(2.999749474120944, 44.25341758107761, 1.0 / 3.0, 0.1);
        let parsed: GeoTransform = odd.to_string().parse().unwrap();
        assert_eq!(parsed, odd);
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        assert!("1,2,3".parse::<GeoTransform>().is_err());
        assert!("1,2,3,4,5,x".parse::<GeoTransform>().is_err());
    }
}
