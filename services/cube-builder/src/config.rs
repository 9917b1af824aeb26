//! Cube builder configuration.
//!
//! Loaded from a YAML file with `${VAR}` and `${VAR:-default}` substitution,
//! then overridden field by field from the command line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cube_processor::{CubeConfig, TileIndex};

/// Nested `{year: {month: {band_code: path}}}` manifest.
pub type Manifest = BTreeMap<i32, BTreeMap<u32, BTreeMap<String, PathBuf>>>;

/// Top-level builder configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Input and output locations
    pub paths: PathsConfig,

    /// Assembly and container settings
    pub cube: CubeConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory scanned for Sentinel-2 band files
    pub tiles_dir: Option<PathBuf>,

    /// Explicit band file listing, used instead of a directory scan
    pub manifest: Option<Manifest>,

    /// Labelled polygons (GeoJSON)
    pub geojson: Option<PathBuf>,

    /// Elevation raster (GeoTIFF)
    pub elevation: Option<PathBuf>,

    /// Output container directory
    pub output: Option<PathBuf>,

    /// Optional GeoTIFF export of the masked, reprojected elevation
    pub elevation_export: Option<PathBuf>,
}

/// Where the band files come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TileSource {
    Directory(PathBuf),
    Manifest(Manifest),
}

/// Paths after validation.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub tiles: TileSource,
    pub geojson: PathBuf,
    pub elevation: PathBuf,
    pub output: PathBuf,
    pub elevation_export: Option<PathBuf>,
}

impl TileSource {
    /// Build the tile index, scanning the directory if needed.
    pub fn index(&self) -> Result<TileIndex> {
        match self {
            TileSource::Directory(dir) => crate::sources::scan_tiles(dir),
            TileSource::Manifest(manifest) => {
                TileIndex::from_nested(manifest).context("Invalid tile manifest")
            }
        }
    }
}

impl BuilderConfig {
    /// Configuration when no file is given: empty paths, cube settings from
    /// the environment.
    pub fn from_env() -> Self {
        Self {
            paths: PathsConfig::default(),
            cube: CubeConfig::from_env(),
        }
    }

    /// Check required fields and return the resolved paths.
    pub fn resolve(&self) -> Result<ResolvedPaths> {
        self.cube
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid cube configuration: {}", e))?;

        let paths = &self.paths;
        let tiles = match (&paths.tiles_dir, &paths.manifest) {
            (Some(_), Some(_)) => {
                anyhow::bail!("paths.tiles_dir and paths.manifest are mutually exclusive")
            }
            (Some(dir), None) => TileSource::Directory(dir.clone()),
            (None, Some(manifest)) => TileSource::Manifest(manifest.clone()),
            (None, None) => anyhow::bail!("One of paths.tiles_dir or paths.manifest is required"),
        };

        Ok(ResolvedPaths {
            tiles,
            geojson: required(&paths.geojson, "paths.geojson")?,
            elevation: required(&paths.elevation, "paths.elevation")?,
            output: required(&paths.output, "paths.output")?,
            elevation_export: paths.elevation_export.clone(),
        })
    }

    /// Make relative paths relative to `base` (the config file's directory).
    fn rebase(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        let paths = &mut self.paths;
        for p in [
            &mut paths.tiles_dir,
            &mut paths.geojson,
            &mut paths.elevation,
            &mut paths.output,
            &mut paths.elevation_export,
        ]
        .into_iter()
        .flatten()
        {
            rebase(p);
        }
        if let Some(manifest) = &mut paths.manifest {
            manifest
                .values_mut()
                .flat_map(|months| months.values_mut())
                .flat_map(|bands| bands.values_mut())
                .for_each(rebase);
        }
    }
}

fn required(value: &Option<PathBuf>, name: &str) -> Result<PathBuf> {
    value
        .clone()
        .with_context(|| format!("{} is required (config file or command line)", name))
}

/// Load and parse a builder config file with environment variable substitution.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BuilderConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;

    let mut config = parse_config(&content)
        .with_context(|| format!("Failed to parse config from {:?}", path))?;

    if let Some(base) = path.parent() {
        config.rebase(base);
    }
    Ok(config)
}

/// Parse config text, expanding `${...}` references first.
pub fn parse_config(content: &str) -> Result<BuilderConfig> {
    let expanded = expand_env_vars(content)?;
    let config: BuilderConfig = serde_yaml::from_str(&expanded)?;
    Ok(config)
}

/// Expand environment variables in YAML content.
/// Supports ${VAR} and ${VAR:-default} syntax.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut var_expr = String::new();
        let mut depth = 1;
        while depth > 0 {
            match chars.next() {
                Some('{') => {
                    depth += 1;
                    var_expr.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth > 0 {
                        var_expr.push('}');
                    }
                }
                Some(c) => var_expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
            }
        }

        result.push_str(&resolve_var_expr(&var_expr)?);
    }

    Ok(result)
}

/// Resolve `VAR` or `VAR:-default`; an empty variable takes the default.
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
