//! Coordinate Reference System identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A coordinate reference system identified by its EPSG code.
///
/// Rasters and polygon sets only ever carry EPSG-coded CRSs in this
/// pipeline, so the code alone is the canonical identity. Two layers are in
/// the same CRS exactly when their codes are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    epsg: u16,
}

impl Crs {
    /// WGS84 geographic, the default CRS of GeoJSON.
    pub const WGS84: Crs = Crs { epsg: 4326 };

    /// Create a CRS from an EPSG code.
    pub const fn epsg(code: u16) -> Self {
        Self { epsg: code }
    }

    /// The EPSG code.
    pub fn code(&self) -> u16 {
        self.epsg
    }

    /// Parse a CRS string.
    ///
    /// Accepts formats like:
    /// - "EPSG:32631"
    /// - "epsg:4326"
    /// - "CRS:84" (WGS84 with lon/lat axis order)
    /// - "urn:ogc:def:crs:EPSG::2154" (legacy GeoJSON named CRS)
    /// - "urn:ogc:def:crs:OGC:1.3:CRS84"
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let normalized = s.trim().to_uppercase();

        if normalized == "CRS:84" || normalized.ends_with(":CRS84") {
            return Ok(Self::WGS84);
        }

        let code = if let Some(rest) = normalized.strip_prefix("EPSG:") {
            rest
        } else if let Some(pos) = normalized.rfind("EPSG:") {
            // urn:ogc:def:crs:EPSG::2154 and urn:ogc:def:crs:EPSG:6.6:2154
            normalized[pos + 5..].rsplit(':').next().unwrap_or_default()
        } else {
            return Err(ParseError::InvalidCrs(s.to_string()));
        };

        code.parse::<u16>()
            .map(Self::epsg)
            .map_err(|_| ParseError::InvalidCrs(s.to_string()))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

impl FromStr for Crs {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Crs {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}
