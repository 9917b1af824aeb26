//! Test data generators for synthetic band and elevation rasters.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a grid where every cell has the same value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a reflectance-like band (Sentinel-2 digital numbers).
///
/// Values grow left to right from `base` in steps of 10 and from top to
/// bottom in steps of 100, so each pixel is unique and integral.
pub fn create_band_grid(width: usize, height: usize, base: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(base + (col * 10 + row * 100) as f32);
        }
    }
    data
}

/// Creates an elevation-like grid in metres, rising from `low` at the
/// top-left corner to roughly `high` at the bottom-right.
pub fn create_elevation_grid(width: usize, height: usize, low: f32, high: f32) -> Vec<f32> {
    let span = (width + height).saturating_sub(2).max(1) as f32;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(low + (high - low) * (col + row) as f32 / span);
        }
    }
    data
}

/// Creates a grid with NaN values at the given indices.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    base_value: f32,
    nan_indices: &[usize],
) -> Vec<f32> {
    let mut data = vec![base_value; width * height];
    for &idx in nan_indices {
        if idx < data.len() {
            data[idx] = f32::NAN;
        }
    }
    data
}
