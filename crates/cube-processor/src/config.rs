//! Configuration for cube assembly and serialization.

use cube_common::PotentialClass;
use serde::{Deserialize, Serialize};

/// Default GeoJSON property carrying the label class.
pub const DEFAULT_LABEL_PROPERTY: &str = "pot_global";

/// Configuration for the cube processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    /// Chunk dimension for Zarr arrays (square chunks in the spatial plane).
    pub zarr_chunk_size: usize,

    /// Compression codec for Zarr arrays.
    pub zarr_compression: ZarrCompression,

    /// Compression level (1-9).
    pub zarr_compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub zarr_shuffle: bool,

    /// Feature property holding the label class.
    pub label_property: String,

    /// Classes whose polygons contribute to the mask.
    pub positive_labels: Vec<PotentialClass>,

    /// Replace band pixels equal to the source nodata value with NaN.
    pub nodata_as_nan: bool,

    /// Reject band rasters that do not sit on the reference grid.
    pub enforce_grid_match: bool,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            zarr_chunk_size: 512,
            zarr_compression: ZarrCompression::BloscZstd,
            zarr_compression_level: 5,
            zarr_shuffle: true,
            label_property: DEFAULT_LABEL_PROPERTY.to_string(),
            positive_labels: PotentialClass::ALL.to_vec(),
            nodata_as_nan: false,
            enforce_grid_match: true,
        }
    }
}

impl CubeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ZARR_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                config.zarr_chunk_size = size;
            }
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION") {
            config.zarr_compression = ZarrCompression::from_str(&val);
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.zarr_compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("ZARR_SHUFFLE") {
            config.zarr_shuffle = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("CUBE_LABEL_PROPERTY") {
            if !val.trim().is_empty() {
                config.label_property = val.trim().to_string();
            }
        }

        // Comma separated, e.g. "Limite,Moyen"; unknown entries are dropped
        if let Ok(val) = std::env::var("CUBE_POSITIVE_LABELS") {
            let labels: Vec<PotentialClass> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if !labels.is_empty() {
                config.positive_labels = labels;
            }
        }

        if let Ok(val) = std::env::var("CUBE_NODATA_AS_NAN") {
            config.nodata_as_nan = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("CUBE_ENFORCE_GRID_MATCH") {
            config.enforce_grid_match = parse_flag(&val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.zarr_chunk_size == 0 {
            return Err("zarr_chunk_size must be > 0".to_string());
        }

        if self.zarr_compression_level == 0 || self.zarr_compression_level > 9 {
            return Err("zarr_compression_level must be 1-9".to_string());
        }

        if self.label_property.is_empty() {
            return Err("label_property must not be empty".to_string());
        }

        if self.positive_labels.is_empty() {
            return Err("positive_labels must name at least one class".to_string());
        }

        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

/// Compression codec for Zarr arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZarrCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd.
    #[default]
    BloscZstd,
}

impl ZarrCompression {
    /// Parse from string (case-insensitive), falling back to Blosc/Zstd.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "none" => Self::None,
            "lz4" | "blosc_lz4" => Self::BloscLz4,
            _ => Self::BloscZstd,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
