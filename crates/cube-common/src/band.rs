//! The fixed spectral band set and the fixed label classes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Raw spectral bands read per time step (Sentinel-2 10 m bands).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Band {
    /// B02
    Blue,
    /// B03
    Green,
    /// B04
    Red,
    /// B08
    Nir,
}

impl Band {
    /// Raw bands in slab order.
    pub const ALL: [Band; 4] = [Band::Blue, Band::Green, Band::Red, Band::Nir];

    /// Number of bands in a time-step slab: the raw bands plus the derived index.
    pub const SLAB_BAND_COUNT: usize = Self::ALL.len() + 1;

    /// Slab channel names, derived index last.
    pub const SLAB_BAND_NAMES: [&'static str; 5] = ["blue", "green", "red", "nir", "ndvi"];

    /// Sentinel-2 band code.
    pub fn code(&self) -> &'static str {
        match self {
            Band::Blue => "B02",
            Band::Green => "B03",
            Band::Red => "B04",
            Band::Nir => "B08",
        }
    }

    /// Channel index of this band within a slab.
    pub fn slab_index(&self) -> usize {
        match self {
            Band::Blue => 0,
            Band::Green => 1,
            Band::Red => 2,
            Band::Nir => 3,
        }
    }

    /// Parse a band code (`B02`, `b8`, ...) or name (`nir`, `red`, ...).
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "B02" | "B2" | "BLUE" => Some(Band::Blue),
            "B03" | "B3" | "GREEN" => Some(Band::Green),
            "B04" | "B4" | "RED" => Some(Band::Red),
            "B08" | "B8" | "NIR" => Some(Band::Nir),
            _ => None,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Band {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| ParseError::UnknownBand(s.to_string()))
    }
}

/// Soil potential classes of the polygon layer's `pot_global` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PotentialClass {
    #[serde(rename = "Limite")]
    Limite,
    #[serde(rename = "Assez_limite")]
    AssezLimite,
    #[serde(rename = "Moyen")]
    Moyen,
    #[serde(rename = "Assez_fort")]
    AssezFort,
    #[serde(rename = "Fort_a_tres_fort")]
    FortATresFort,
}

impl PotentialClass {
    /// All classes, weakest first.
    pub const ALL: [PotentialClass; 5] = [
        PotentialClass::Limite,
        PotentialClass::AssezLimite,
        PotentialClass::Moyen,
        PotentialClass::AssezFort,
        PotentialClass::FortATresFort,
    ];

    /// Label as it appears in the source data.
    pub fn label(&self) -> &'static str {
        match self {
            PotentialClass::Limite => "Limite",
            PotentialClass::AssezLimite => "Assez_limite",
            PotentialClass::Moyen => "Moyen",
            PotentialClass::AssezFort => "Assez_fort",
            PotentialClass::FortATresFort => "Fort_a_tres_fort",
        }
    }

    /// Exact-match lookup of a source label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl fmt::Display for PotentialClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PotentialClass {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s.trim()).ok_or_else(|| ParseError::UnknownClass(s.to_string()))
    }
}
