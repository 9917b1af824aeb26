//! Interpolation methods for grid resampling.

use serde::{Deserialize, Serialize};

/// Resampling method used when moving a raster onto another grid.
///
/// Nearest neighbour is the only method: it copies source values unchanged,
/// so categorical and integer data survive resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    #[default]
    Nearest,
}

/// Nearest neighbour interpolation.
///
/// `x` and `y` are fractional pixel coordinates measured from the top-left
/// corner of the raster; the pixel whose area contains the point is returned.
/// Points outside the raster give NaN.
pub fn nearest_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
        return f32::NAN;
    }

    let col = x.floor() as usize;
    let row = y.floor() as usize;

    if col >= width || row >= height {
        return f32::NAN;
    }

    data[row * width + col]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_picks_containing_pixel() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(nearest_interpolate(&data, 2, 2, 0.5, 0.5), 1.0);
        assert_eq!(nearest_interpolate(&data, 2, 2, 1.99, 0.0), 2.0);
        assert_eq!(nearest_interpolate(&data, 2, 2, 0.2, 1.7), 3.0);
    }

    #[test]
    fn test_nearest_outside_is_nan() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert!(nearest_interpolate(&data, 2, 2, -0.1, 0.5).is_nan());
        assert!(nearest_interpolate(&data, 2, 2, 2.0, 0.5).is_nan());
        assert!(nearest_interpolate(&data, 2, 2, 0.5, f64::NAN).is_nan());
    }
}
