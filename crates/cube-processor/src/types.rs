//! Core in-memory types of the cube.

use std::collections::BTreeMap;

use cube_common::{Band, GridDescriptor, RasterMeta, TimeStep};

/// A 2D `f32` layer on some pixel grid, row-major, top row first.
///
/// Missing values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl RasterLayer {
    /// Create a layer. Panics if `data` does not hold `width * height` values.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> Self {
        assert_eq!(data.len(), width * height, "layer data does not match its shape");
        Self {
            data,
            width,
            height,
        }
    }

    /// Value at (col, row), if inside the layer.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    /// Shape as `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn stats(&self) -> LayerStats {
        LayerStats::from_values(self.data.iter().copied())
    }
}

/// Summary statistics over the finite values of a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStats {
    pub valid: usize,
    pub total: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f64,
}

impl LayerStats {
    pub fn from_values(values: impl Iterator<Item = f32>) -> Self {
        let mut stats = LayerStats {
            valid: 0,
            total: 0,
            min: f32::NAN,
            max: f32::NAN,
            mean: f64::NAN,
        };
        let mut sum = 0.0f64;

        for v in values {
            stats.total += 1;
            if !v.is_finite() {
                continue;
            }
            stats.valid += 1;
            sum += v as f64;
            // f32::min/max ignore a NaN operand, which seeds the first value
            stats.min = stats.min.min(v);
            stats.max = stats.max.max(v);
        }

        if stats.valid > 0 {
            stats.mean = sum / stats.valid as f64;
        }
        stats
    }
}

/// Boolean inclusion mask on the reference grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMask {
    pub data: Vec<bool>,
    pub width: usize,
    pub height: usize,
}

impl LabelMask {
    /// An all-false mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![false; width * height],
            width,
            height,
        }
    }

    /// Whether pixel (col, row) is included.
    pub fn get(&self, col: usize, row: usize) -> bool {
        col < self.width && row < self.height && self.data[row * self.width + col]
    }

    pub fn set(&mut self, col: usize, row: usize) {
        self.data[row * self.width + col] = true;
    }

    /// OR another mask into this one.
    pub fn union_with(&mut self, other: &LabelMask) {
        for (dst, src) in self.data.iter_mut().zip(&other.data) {
            *dst |= *src;
        }
    }

    /// Number of included pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|v| **v).count()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// One time step's `(height, width, 5)` stack, channels interleaved per pixel
/// in the order blue, green, red, nir, ndvi.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStepSlab {
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

/// Channel index of the derived NDVI band.
pub const NDVI_INDEX: usize = Band::SLAB_BAND_COUNT - 1;

impl TimeStepSlab {
    /// Interleave five equally shaped layers into one slab.
    pub fn from_layers(layers: [&RasterLayer; Band::SLAB_BAND_COUNT]) -> Self {
        let (width, height) = (layers[0].width, layers[0].height);
        let mut data = Vec::with_capacity(width * height * Band::SLAB_BAND_COUNT);

        for i in 0..width * height {
            for layer in &layers {
                data.push(layer.data[i]);
            }
        }

        Self {
            data,
            width,
            height,
        }
    }

    /// Value of channel `band` at (col, row).
    pub fn get(&self, col: usize, row: usize, band: usize) -> f32 {
        self.data[(row * self.width + col) * Band::SLAB_BAND_COUNT + band]
    }

    /// Extract one channel as a layer.
    pub fn channel(&self, band: usize) -> RasterLayer {
        let data = self
            .data
            .iter()
            .skip(band)
            .step_by(Band::SLAB_BAND_COUNT)
            .copied()
            .collect();
        RasterLayer::new(data, self.width, self.height)
    }

    /// Shape as `(height, width, bands)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, Band::SLAB_BAND_COUNT)
    }
}

/// The assembled cube, built fully in memory before serialization.
#[derive(Debug, Clone)]
pub struct Cube {
    pub grid: GridDescriptor,
    pub meta: RasterMeta,
    pub elevation: RasterLayer,
    pub mask: LabelMask,
    /// Ordered by year, then month.
    pub slabs: BTreeMap<TimeStep, TimeStepSlab>,
}

impl Cube {
    /// Time steps in storage order.
    pub fn time_steps(&self) -> Vec<TimeStep> {
        self.slabs.keys().copied().collect()
    }

    /// Slabs grouped by year for callers that want the nested view.
    pub fn by_year(&self) -> BTreeMap<i32, BTreeMap<u32, &TimeStepSlab>> {
        let mut years: BTreeMap<i32, BTreeMap<u32, &TimeStepSlab>> = BTreeMap::new();
        for (step, slab) in &self.slabs {
            years.entry(step.year).or_default().insert(step.month, slab);
        }
        years
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_ignore_nan() {
        let layer = RasterLayer::new(vec![1.0, f32::NAN, 3.0, 5.0], 2, 2);
        let stats = layer.stats();
        assert_eq!(stats.valid, 3);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.mean, 3.0);
    }

    #[test]
    fn test_stats_all_nan() {
        let stats = RasterLayer::new(vec![f32::NAN; 4], 2, 2).stats();
        assert_eq!(stats.valid, 0);
        assert!(stats.min.is_nan());
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn test_slab_interleaving() {
        let layers: Vec<RasterLayer> = (0..5)
            .map(|b| RasterLayer::new(vec![b as f32 * 10.0, b as f32 * 10.0 + 1.0], 2, 1))
            .collect();
        let slab = TimeStepSlab::from_layers([
            &layers[0], &layers[1], &layers[2], &layers[3], &layers[4],
        ]);

        assert_eq!(slab.shape(), (1, 2, 5));
        assert_eq!(&slab.data[..5], &[0.0, 10.0, 20.0, 30.0, 40.0]);
        assert_eq!(slab.get(1, 0, NDVI_INDEX), 41.0);
        assert_eq!(slab.channel(2), layers[2]);
    }

    #[test]
    fn test_mask_union() {
        let mut a = LabelMask::new(2, 2);
        a.set(0, 0);
        let mut b = LabelMask::new(2, 2);
        b.set(1, 1);
        a.union_with(&b);
        assert_eq!(a.data, vec![true, false, false, true]);
        assert_eq!(a.count(), 2);
        assert!(!a.get(5, 5));
    }
}
