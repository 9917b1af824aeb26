//! Index of band rasters per time step.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cube_common::{Band, TimeStep};

use crate::error::{CubeError, Result};

/// Band raster paths keyed by time step, ordered by year then month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileIndex {
    steps: BTreeMap<TimeStep, BTreeMap<Band, PathBuf>>,
}

impl TileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the nested `{year: {month: {band_code: path}}}` form.
    pub fn from_nested(
        nested: &BTreeMap<i32, BTreeMap<u32, BTreeMap<String, PathBuf>>>,
    ) -> Result<Self> {
        let mut index = Self::new();
        for (&year, months) in nested {
            for (&month, bands) in months {
                let step = TimeStep::new(year, month)
                    .map_err(|e| CubeError::Config(e.to_string()))?;
                for (code, path) in bands {
                    let band = Band::from_code(code).ok_or_else(|| {
                        CubeError::Config(format!("unknown band '{}' in {}", code, step))
                    })?;
                    index.insert(step, band, path.clone());
                }
            }
        }
        Ok(index)
    }

    /// Register a path, returning the one it replaced.
    pub fn insert(&mut self, step: TimeStep, band: Band, path: PathBuf) -> Option<PathBuf> {
        self.steps.entry(step).or_default().insert(band, path)
    }

    pub fn get(&self, step: TimeStep, band: Band) -> Option<&Path> {
        self.steps.get(&step)?.get(&band).map(PathBuf::as_path)
    }

    /// Paths of one time step.
    pub fn bands(&self, step: TimeStep) -> Option<&BTreeMap<Band, PathBuf>> {
        self.steps.get(&step)
    }

    /// Bands of the fixed set with no path for `step`.
    pub fn missing_bands(&self, step: TimeStep) -> Vec<Band> {
        let present = self.steps.get(&step);
        Band::ALL
            .into_iter()
            .filter(|b| present.map_or(true, |p| !p.contains_key(b)))
            .collect()
    }

    /// Time steps in processing order.
    pub fn time_steps(&self) -> impl Iterator<Item = TimeStep> + '_ {
        self.steps.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TimeStep, &BTreeMap<Band, PathBuf>)> {
        self.steps.iter().map(|(s, b)| (*s, b))
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
