//! Cube assembly.
//!
//! The assembler walks the time steps of a [`TileIndex`] in order and keeps
//! its progress in an explicit [`AssemblyState`]:
//!
//! ```text
//! GridUninitialized -> GridEstablished -> MaskEstablished
//!     -> Processing(step) -> ... -> Done
//! ```
//!
//! The near-infrared band of the first time step defines the reference grid,
//! the label mask is built once against it, and every later layer is checked
//! against that grid and masked with that mask.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cube_common::{Band, GridDescriptor, RasterMeta, TimeStep};
use tracing::{debug, info, warn};

use crate::config::CubeConfig;
use crate::error::{CubeError, Result};
use crate::mask::{apply_mask, build_mask, PolygonSet};
use crate::projection::{reproject, ResamplingMethod};
use crate::raster::{RasterSource, SourceRaster};
use crate::tiles::TileIndex;
use crate::types::{Cube, LabelMask, RasterLayer, TimeStepSlab};

/// Driver name recorded in the container metadata.
pub const SOURCE_DRIVER: &str = "GTiff";

/// Progress of an assembly run.
#[derive(Debug, Clone)]
pub enum AssemblyState {
    GridUninitialized,
    GridEstablished {
        grid: GridDescriptor,
    },
    MaskEstablished {
        grid: GridDescriptor,
        mask: LabelMask,
    },
    Processing {
        grid: GridDescriptor,
        mask: LabelMask,
        last: TimeStep,
    },
    Done,
}

impl AssemblyState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GridUninitialized => "GridUninitialized",
            Self::GridEstablished { .. } => "GridEstablished",
            Self::MaskEstablished { .. } => "MaskEstablished",
            Self::Processing { .. } => "Processing",
            Self::Done => "Done",
        }
    }

    /// The reference grid, once established.
    pub fn grid(&self) -> Option<&GridDescriptor> {
        match self {
            Self::GridEstablished { grid }
            | Self::MaskEstablished { grid, .. }
            | Self::Processing { grid, .. } => Some(grid),
            _ => None,
        }
    }

    /// The label mask, once built.
    pub fn mask(&self) -> Option<&LabelMask> {
        match self {
            Self::MaskEstablished { mask, .. } | Self::Processing { mask, .. } => Some(mask),
            _ => None,
        }
    }
}

/// A time step left out of the cube.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedStep {
    pub step: TimeStep,
    pub reason: String,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyReport {
    pub written: Vec<TimeStep>,
    pub skipped: Vec<SkippedStep>,
    pub mask_pixels: usize,
    pub total_pixels: usize,
}

/// Builds a [`Cube`] from band rasters, polygons and an elevation raster.
pub struct CubeAssembler<'a, S: RasterSource + ?Sized> {
    source: &'a S,
    config: &'a CubeConfig,
    state: AssemblyState,
    slabs: BTreeMap<TimeStep, TimeStepSlab>,
    report: AssemblyReport,
}

impl<'a, S: RasterSource + ?Sized> CubeAssembler<'a, S> {
    pub fn new(source: &'a S, config: &'a CubeConfig) -> Self {
        Self {
            source,
            config,
            state: AssemblyState::GridUninitialized,
            slabs: BTreeMap::new(),
            report: AssemblyReport::default(),
        }
    }

    pub fn state(&self) -> &AssemblyState {
        &self.state
    }

    /// Run the whole pipeline.
    ///
    /// Any failure while reading the first time step is fatal. A band read
    /// failure on a later step skips that step; it is logged and listed in
    /// the report.
    pub fn assemble(
        mut self,
        tiles: &TileIndex,
        polygons: &PolygonSet,
        elevation_path: &Path,
    ) -> Result<(Cube, AssemblyReport)> {
        let mut steps = tiles.iter();
        let (first_step, first_paths) = steps
            .next()
            .ok_or_else(|| CubeError::Config("tile index has no time steps".to_string()))?;

        info!(
            time_steps = tiles.len(),
            first = %first_step,
            "Starting cube assembly"
        );

        let nir_path = band_path(first_step, Band::Nir, first_paths)?;
        let reference = open_band(self.source, first_step, Band::Nir, nir_path)?;

        self.establish_grid(reference.grid.clone())?;
        self.establish_mask(polygons)?;
        self.process_loaded_step(first_step, first_paths, Some(reference))?;

        for (step, paths) in steps {
            match self.process_step(step, paths) {
                Ok(()) => {}
                Err(e) if e.is_step_local() => {
                    warn!(step = %step, error = %e, "Skipping time step");
                    self.report.skipped.push(SkippedStep {
                        step,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        self.finish(elevation_path)
    }

    /// Fix the reference grid. Valid only before any grid is set.
    pub fn establish_grid(&mut self, grid: GridDescriptor) -> Result<()> {
        if !matches!(self.state, AssemblyState::GridUninitialized) {
            return Err(self.out_of_order("establish the reference grid"));
        }
        if grid.is_empty() {
            return Err(CubeError::format("reference grid has a zero dimension"));
        }

        info!(
            crs = %grid.crs,
            width = grid.width,
            height = grid.height,
            transform = %grid.transform,
            dtype = %grid.pixel_type,
            "Established reference grid"
        );
        self.state = AssemblyState::GridEstablished { grid };
        Ok(())
    }

    /// Build the label mask against the reference grid.
    pub fn establish_mask(&mut self, polygons: &PolygonSet) -> Result<()> {
        let AssemblyState::GridEstablished { grid } = &self.state else {
            return Err(self.out_of_order("build the label mask"));
        };

        let mask = build_mask(polygons, grid, &self.config.positive_labels)?;
        self.report.mask_pixels = mask.count();
        self.report.total_pixels = grid.len();

        if let AssemblyState::GridEstablished { grid } =
            std::mem::replace(&mut self.state, AssemblyState::Done)
        {
            self.state = AssemblyState::MaskEstablished { grid, mask };
        }
        Ok(())
    }

    /// Read, check, mask and stack the bands of one time step.
    ///
    /// Steps must arrive in increasing order.
    pub fn process_step(&mut self, step: TimeStep, paths: &BTreeMap<Band, PathBuf>) -> Result<()> {
        self.process_loaded_step(step, paths, None)
    }

    fn process_loaded_step(
        &mut self,
        step: TimeStep,
        paths: &BTreeMap<Band, PathBuf>,
        mut preloaded_nir: Option<SourceRaster>,
    ) -> Result<()> {
        let (grid, mask) = match &self.state {
            AssemblyState::MaskEstablished { grid, mask } => (grid, mask),
            AssemblyState::Processing { grid, mask, last } if step > *last => (grid, mask),
            AssemblyState::Processing { last, .. } => {
                return Err(CubeError::Config(format!(
                    "time step {} does not follow {}",
                    step, last
                )))
            }
            _ => return Err(self.out_of_order("process a time step")),
        };

        let mut layers: Vec<RasterLayer> = Vec::with_capacity(Band::SLAB_BAND_COUNT);
        for band in Band::ALL {
            let preloaded = if band == Band::Nir {
                preloaded_nir.take()
            } else {
                None
            };
            let raster = match preloaded {
                Some(raster) => raster,
                None => open_band(self.source, step, band, band_path(step, band, paths)?)?,
            };
            layers.push(conform(raster, step, band, grid, self.config)?);
        }

        let index = ndvi(&layers[Band::Red.slab_index()], &layers[Band::Nir.slab_index()]);
        layers.push(index);

        let masked: Vec<RasterLayer> = layers.iter().map(|l| apply_mask(l, mask)).collect();
        for (name, layer) in Band::SLAB_BAND_NAMES.iter().zip(&masked) {
            let stats = layer.stats();
            debug!(
                step = %step,
                band = name,
                valid = stats.valid,
                min = stats.min,
                max = stats.max,
                mean = stats.mean,
                "Masked band"
            );
        }

        let slab = TimeStepSlab::from_layers([
            &masked[0], &masked[1], &masked[2], &masked[3], &masked[4],
        ]);
        self.slabs.insert(step, slab);
        self.report.written.push(step);
        info!(step = %step, "Stacked time step");

        if let AssemblyState::MaskEstablished { grid, mask }
        | AssemblyState::Processing { grid, mask, .. } =
            std::mem::replace(&mut self.state, AssemblyState::Done)
        {
            self.state = AssemblyState::Processing {
                grid,
                mask,
                last: step,
            };
        }
        Ok(())
    }

    /// Reproject and mask the elevation raster, then hand over the cube.
    pub fn finish(&mut self, elevation_path: &Path) -> Result<(Cube, AssemblyReport)> {
        let AssemblyState::Processing { grid, mask, .. } = &self.state else {
            return Err(self.out_of_order("finish"));
        };

        let elevation = self.source.open(elevation_path)?;
        let aligned = reproject(&elevation.layer, &elevation.grid, grid, ResamplingMethod::Nearest)?;
        let elevation_layer = apply_mask(&aligned, mask);

        let stats = elevation_layer.stats();
        info!(
            source_crs = %elevation.grid.crs,
            valid = stats.valid,
            min = stats.min,
            max = stats.max,
            mean = stats.mean,
            "Aligned elevation"
        );

        let (grid, mask) = match std::mem::replace(&mut self.state, AssemblyState::Done) {
            AssemblyState::Processing { grid, mask, .. } => (grid, mask),
            other => {
                self.state = other;
                return Err(self.out_of_order("finish"));
            }
        };

        let cube = Cube {
            meta: RasterMeta::from_grid(&grid, SOURCE_DRIVER),
            grid,
            elevation: elevation_layer,
            mask,
            slabs: std::mem::take(&mut self.slabs),
        };

        info!(
            written = self.report.written.len(),
            skipped = self.report.skipped.len(),
            mask_pixels = self.report.mask_pixels,
            "Cube assembled"
        );
        Ok((cube, std::mem::take(&mut self.report)))
    }

    fn out_of_order(&self, action: &str) -> CubeError {
        CubeError::Config(format!("cannot {} in state {}", action, self.state.name()))
    }
}

/// Normalized difference vegetation index, `(nir - red) / (nir + red)`.
///
/// Non-finite results (zero denominators, NaN inputs) become NaN.
pub fn ndvi(red: &RasterLayer, nir: &RasterLayer) -> RasterLayer {
    let data = red
        .data
        .iter()
        .zip(&nir.data)
        .map(|(&r, &n)| {
            let v = (n - r) / (n + r);
            if v.is_finite() {
                v
            } else {
                f32::NAN
            }
        })
        .collect();
    RasterLayer::new(data, red.width, red.height)
}

fn band_path<'p>(
    step: TimeStep,
    band: Band,
    paths: &'p BTreeMap<Band, PathBuf>,
) -> Result<&'p Path> {
    paths
        .get(&band)
        .map(PathBuf::as_path)
        .ok_or_else(|| CubeError::band_read(step, band, "no raster listed"))
}

fn open_band<S: RasterSource + ?Sized>(
    source: &S,
    step: TimeStep,
    band: Band,
    path: &Path,
) -> Result<SourceRaster> {
    source
        .open(path)
        .map_err(|e| CubeError::band_read(step, band, e.to_string()))
}

/// Check a band against the reference grid and convert it to a layer.
fn conform(
    raster: SourceRaster,
    step: TimeStep,
    band: Band,
    grid: &GridDescriptor,
    config: &CubeConfig,
) -> Result<RasterLayer> {
    if config.enforce_grid_match {
        if let Some(reason) = grid.alignment_mismatch(&raster.grid) {
            return Err(CubeError::band_read(
                step,
                band,
                format!("not on the reference grid: {}", reason),
            ));
        }
    } else if raster.grid.shape() != grid.shape() {
        return Err(CubeError::band_read(
            step,
            band,
            format!(
                "shape {}x{} differs from the reference grid",
                raster.grid.width, raster.grid.height
            ),
        ));
    }

    Ok(if config.nodata_as_nan {
        raster.nodata_as_nan()
    } else {
        raster.layer
    })
}
