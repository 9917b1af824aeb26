//! One build: tile index, polygons, assembly, container write.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use cube_common::{GridDescriptor, PixelType};
use cube_processor::raster::write_geotiff;
use cube_processor::{
    AssemblyReport, ContainerWriteResult, ContainerWriter, Cube, CubeAssembler, CubeConfig,
    GeoTiffSource, PolygonSet, SampleEncoding,
};

use crate::config::ResolvedPaths;

/// What a build produced.
#[derive(Debug)]
pub struct BuildSummary {
    pub report: AssemblyReport,
    pub container: ContainerWriteResult,
    pub elevation_exported: bool,
}

pub fn run(paths: &ResolvedPaths, config: &CubeConfig) -> Result<BuildSummary> {
    let start = Instant::now();

    let tiles = paths.tiles.index()?;
    anyhow::ensure!(!tiles.is_empty(), "No band files found");
    info!(time_steps = tiles.len(), "Tile index ready");

    let (polygons, loaded) = PolygonSet::from_geojson_file(&paths.geojson, &config.label_property)
        .with_context(|| format!("Failed to load polygons from {:?}", paths.geojson))?;
    info!(
        polygons = loaded.loaded,
        null_geometry = loaded.null_geometry,
        non_areal = loaded.non_areal,
        unlabeled = loaded.unlabeled,
        crs = %polygons.crs,
        "Loaded labelled polygons"
    );

    let (cube, report) = CubeAssembler::new(&GeoTiffSource, config)
        .assemble(&tiles, &polygons, &paths.elevation)
        .context("Cube assembly failed")?;

    let container = ContainerWriter::new(config.clone())
        .write(&cube, &paths.output)
        .with_context(|| format!("Failed to write container {:?}", paths.output))?;

    let elevation_exported = match &paths.elevation_export {
        Some(path) => {
            export_elevation(&cube, path)?;
            true
        }
        None => false,
    };

    info!(
        output = %paths.output.display(),
        written = report.written.len(),
        skipped = report.skipped.len(),
        mask_pixels = report.mask_pixels,
        bytes = container.bytes_written,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Cube build complete"
    );

    Ok(BuildSummary {
        report,
        container,
        elevation_exported,
    })
}

/// Write the masked elevation on the reference grid as float32 with NaN nodata.
fn export_elevation(cube: &Cube, path: &Path) -> Result<()> {
    let grid = GridDescriptor {
        pixel_type: PixelType::Float32,
        nodata: Some(f64::NAN),
        ..cube.grid.clone()
    };
    write_geotiff(path, &cube.elevation, &grid, SampleEncoding::Float32)
        .with_context(|| format!("Failed to export elevation to {:?}", path))?;
    info!(path = %path.display(), "Exported masked elevation");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileSource;
    use cube_common::{Band, Crs, GeoTransform, TimeStep};
    use cube_processor::raster::read_geotiff;
    use cube_processor::{ContainerReader, RasterLayer};
    use std::fs;
    use test_utils::fixtures::grid::UTM_4X4;
    use test_utils::{create_band_grid, create_constant_grid, sentinel_tile_name, two_corner_blocks};

    fn utm_grid() -> GridDescriptor {
        GridDescriptor {
            crs: Crs::epsg(32631),
            transform: GeoTransform::from_origin(UTM_4X4.west, UTM_4X4.north, 10.0, 10.0),
            width: 4,
            height: 4,
            pixel_type: PixelType::Uint16,
            nodata: Some(0.0),
        }
    }

    fn write_scene(root: &Path) -> ResolvedPaths {
        let tiles = root.join("tiles");
        fs::create_dir(&tiles).unwrap();
        let grid = utm_grid();

        for (i, stamp) in ["20190103T104431", "20190207T104219"].into_iter().enumerate() {
            for band in Band::ALL {
                let data = match band {
                    Band::Nir => create_constant_grid(4, 4, 3000.0),
                    Band::Red => create_constant_grid(4, 4, 1000.0),
                    _ => create_band_grid(4, 4, 100.0 * (i + 1) as f32),
                };
                let path = tiles.join(sentinel_tile_name("T31TEJ", stamp, band.code()));
                write_geotiff(&path, &RasterLayer::new(data, 4, 4), &grid, SampleEncoding::Uint16)
                    .unwrap();
            }
        }

        let elevation = root.join("dem.tif");
        let dem_grid = GridDescriptor {
            pixel_type: PixelType::Float32,
            nodata: None,
            ..grid.clone()
        };
        write_geotiff(
            &elevation,
            &RasterLayer::new(create_constant_grid(4, 4, 412.0), 4, 4),
            &dem_grid,
            SampleEncoding::Float32,
        )
        .unwrap();

        let geojson = root.join("sols.geojson");
        fs::write(&geojson, two_corner_blocks(&UTM_4X4, 32631)).unwrap();

        ResolvedPaths {
            tiles: TileSource::Directory(tiles),
            geojson,
            elevation,
            output: root.join("cube.zarr"),
            elevation_export: Some(root.join("elevation_masked.tif")),
        }
    }

    #[test]
    fn test_run_builds_container() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_scene(dir.path());
        let config = CubeConfig {
            zarr_chunk_size: 2,
            ..CubeConfig::default()
        };

        let summary = run(&paths, &config).unwrap();
        assert_eq!(summary.report.written.len(), 2);
        assert_eq!(summary.report.mask_pixels, 8);
        assert_eq!(summary.container.arrays, 4);
        assert!(summary.elevation_exported);

        let reader = ContainerReader::open(&paths.output).unwrap();
        assert_eq!(
            reader.time_steps(),
            &[TimeStep::new(2019, 1).unwrap(), TimeStep::new(2019, 2).unwrap()]
        );
        let slab = reader.read_slab(TimeStep::new(2019, 2).unwrap()).unwrap();
        assert_eq!(slab.get(0, 0, 0), 200.0);
        assert_eq!(slab.get(0, 0, 4), 0.5);
        assert!(slab.get(3, 0, 4).is_nan());

        let exported = read_geotiff(paths.elevation_export.as_ref().unwrap()).unwrap();
        assert_eq!(exported.grid.pixel_type, PixelType::Float32);
        assert_eq!(exported.layer.get(0, 0), Some(412.0));
        assert!(exported.layer.get(0, 3).unwrap().is_nan());
    }

    #[test]
    fn test_run_without_tiles_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = write_scene(dir.path());
        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        paths.tiles = TileSource::Directory(empty);

        let err = run(&paths, &CubeConfig::default()).unwrap_err();
        assert!(err.to_string().contains("No band files"));
        assert!(!paths.output.exists());
    }
}
