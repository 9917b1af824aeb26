//! Label cube builder.
//!
//! Reads monthly Sentinel-2 band tiles, an elevation raster and labelled soil
//! polygons, and writes the masked multi-temporal cube to a Zarr container.

mod config;
mod pipeline;
mod sources;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use config::BuilderConfig;

#[derive(Parser, Debug)]
#[command(name = "cube-builder")]
#[command(about = "Build a labelled multi-temporal raster cube")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "CUBE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the band files (overrides the config)
    #[arg(long, env = "CUBE_TILES_DIR")]
    tiles_dir: Option<PathBuf>,

    /// Labelled polygons (GeoJSON)
    #[arg(long, env = "CUBE_GEOJSON")]
    geojson: Option<PathBuf>,

    /// Elevation raster (GeoTIFF)
    #[arg(long, env = "CUBE_ELEVATION")]
    elevation: Option<PathBuf>,

    /// Output container directory
    #[arg(short, long, env = "CUBE_OUTPUT")]
    output: Option<PathBuf>,

    /// Also write the masked elevation as a GeoTIFF
    #[arg(long)]
    export_elevation: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut BuilderConfig) {
        let paths = &mut config.paths;
        if let Some(dir) = &self.tiles_dir {
            paths.tiles_dir = Some(dir.clone());
            paths.manifest = None;
        }
        if let Some(p) = &self.geojson {
            paths.geojson = Some(p.clone());
        }
        if let Some(p) = &self.elevation {
            paths.elevation = Some(p.clone());
        }
        if let Some(p) = &self.output {
            paths.output = Some(p.clone());
        }
        if let Some(p) = &self.export_elevation {
            paths.elevation_export = Some(p.clone());
        }
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => BuilderConfig::from_env(),
    };
    args.apply_overrides(&mut config);

    let paths = config.resolve()?;
    info!(
        output = %paths.output.display(),
        compression = %config.cube.zarr_compression,
        chunk = config.cube.zarr_chunk_size,
        labels = ?config.cube.positive_labels,
        "Starting cube build"
    );

    let summary = pipeline::run(&paths, &config.cube)?;
    for skipped in &summary.report.skipped {
        warn!(step = %skipped.step, reason = %skipped.reason, "Time step left out of the cube");
    }
    info!(
        arrays = summary.container.arrays,
        elevation_exported = summary.elevation_exported,
        "Done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_manifest() {
        let args = Args::parse_from([
            "cube-builder",
            "--tiles-dir",
            "/tiles",
            "--output",
            "/out.zarr",
            "--log-level",
            "debug",
        ]);
        let mut config = BuilderConfig::default();
        config.paths.manifest = Some(config::Manifest::new());
        config.paths.output = Some("/old.zarr".into());
        config.paths.geojson = Some("/g.geojson".into());

        args.apply_overrides(&mut config);
        assert_eq!(config.paths.tiles_dir, Some(PathBuf::from("/tiles")));
        assert!(config.paths.manifest.is_none());
        assert_eq!(config.paths.output, Some(PathBuf::from("/out.zarr")));
        assert_eq!(config.paths.geojson, Some(PathBuf::from("/g.geojson")));
        assert!(config.paths.elevation.is_none());
    }

    #[test]
    fn test_args_verify() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
