//! Band file discovery.
//!
//! Scans a directory tree for Sentinel-2 L2A style band files such as
//! `T31TEJ_20190103T104431_B02_10m.tif` and groups them by month.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use cube_common::{Band, TimeStep};
use cube_processor::TileIndex;

/// A band file recognised by its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileName {
    /// Acquisition stamp as written in the name (`YYYYMMDDThhmmss`).
    pub acquisition: String,
    pub step: TimeStep,
    pub band: Band,
}

/// Parse a band file name. Returns `None` for anything that is not a
/// `.tif`/`.tiff` carrying an acquisition stamp and one of the four band codes.
pub fn parse_tile_name(name: &str) -> Option<TileName> {
    let (stem, ext) = name.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case("tif") && !ext.eq_ignore_ascii_case("tiff") {
        return None;
    }

    let tokens: Vec<&str> = stem.split('_').collect();
    let (acquisition, step) = tokens.iter().find_map(|t| {
        if t.len() == 15 && t.as_bytes()[8] == b'T' {
            TimeStep::from_acquisition_stamp(t).ok().map(|s| (t.to_string(), s))
        } else {
            None
        }
    })?;
    let band = tokens
        .iter()
        .filter(|t| t.starts_with('B') || t.starts_with('b'))
        .find_map(|t| Band::from_code(t))?;

    Some(TileName {
        acquisition,
        step,
        band,
    })
}

fn is_jpeg2000(name: &str) -> bool {
    name.rsplit_once('.')
        .map_or(false, |(_, ext)| ext.eq_ignore_ascii_case("jp2"))
}

/// Build a tile index from every band file under `dir`.
///
/// Only GeoTIFF band files are read. JPEG 2000 products (`*_B02_10m.jp2`)
/// must be converted to GeoTIFF first; they are reported at `warn` level
/// and left out of the index. When a month holds several acquisitions only
/// the earliest one is used.
pub fn scan_tiles(dir: &Path) -> Result<TileIndex> {
    anyhow::ensure!(dir.is_dir(), "Tile directory {:?} does not exist", dir);

    // step -> acquisition -> band -> path
    let mut found: BTreeMap<TimeStep, BTreeMap<String, BTreeMap<Band, PathBuf>>> = BTreeMap::new();
    let mut ignored = 0usize;
    let mut jpeg2000 = 0usize;

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to scan {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match parse_tile_name(&name) {
            Some(tile) => {
                debug!(file = %name, step = %tile.step, band = %tile.band, "Found band file");
                found
                    .entry(tile.step)
                    .or_default()
                    .entry(tile.acquisition)
                    .or_default()
                    .insert(tile.band, entry.into_path());
            }
            None if is_jpeg2000(&name) => {
                warn!(file = %name, "JPEG 2000 band file skipped, convert it to GeoTIFF");
                jpeg2000 += 1;
            }
            None => ignored += 1,
        }
    }

    let mut index = TileIndex::new();
    for (step, acquisitions) in found {
        let mut acquisitions = acquisitions.into_iter();
        let Some((first, bands)) = acquisitions.next() else {
            continue;
        };
        for (band, path) in bands {
            index.insert(step, band, path);
        }

        let later: Vec<String> = acquisitions.map(|(stamp, _)| stamp).collect();
        if !later.is_empty() {
            warn!(
                step = %step,
                used = %first,
                ignored = ?later,
                "Several acquisitions in one month, keeping the earliest"
            );
        }
        let missing = index.missing_bands(step);
        if !missing.is_empty() {
            warn!(step = %step, acquisition = %first, missing = ?missing, "Incomplete band set");
        }
    }

    info!(
        dir = %dir.display(),
        time_steps = index.len(),
        ignored_files = ignored,
        jpeg2000_files = jpeg2000,
        "Scanned tile directory"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use test_utils::sentinel_tile_name;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_parse_tile_name() {
        let tile = parse_tile_name("T31TEJ_20190103T104431_B08_10m.tif").unwrap();
        assert_eq!(tile.acquisition, "20190103T104431");
        assert_eq!(tile.step, TimeStep::new(2019, 1).unwrap());
        assert_eq!(tile.band, Band::Nir);

        assert!(parse_tile_name("T31TEJ_20190103T104431_B08_10m.TIFF").is_some());
    }

    #[test]
    fn test_parse_tile_name_rejects() {
        assert!(parse_tile_name("T31TEJ_20190103T104431_B08_10m.jp2").is_none());
        assert!(parse_tile_name("T31TEJ_20190103T104431_B11_20m.tif").is_none());
        assert!(parse_tile_name("T31TEJ_B02_10m.tif").is_none());
        assert!(parse_tile_name("T31TEJ_20191303T104431_B02_10m.tif").is_none());
        assert!(parse_tile_name("README").is_none());
    }

    #[test]
    fn test_scan_groups_by_month() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2019");
        fs::create_dir(&nested).unwrap();

        for band in ["B02", "B03", "B04", "B08"] {
            touch(&nested, &sentinel_tile_name("T31TEJ", "20190103T104431", band));
            touch(dir.path(), &sentinel_tile_name("T31TEJ", "20200215T104019", band));
        }
        touch(dir.path(), "notes.txt");

        let index = scan_tiles(dir.path()).unwrap();
        let steps: Vec<TimeStep> = index.time_steps().collect();
        assert_eq!(
            steps,
            vec![TimeStep::new(2019, 1).unwrap(), TimeStep::new(2020, 2).unwrap()]
        );
        assert!(index.missing_bands(steps[0]).is_empty());
        assert_eq!(
            index.get(steps[0], Band::Red),
            Some(nested.join("T31TEJ_20190103T104431_B04_10m.tif").as_path())
        );
    }

    #[test]
    fn test_scan_keeps_earliest_acquisition() {
        let dir = tempfile::tempdir().unwrap();
        for band in ["B02", "B03", "B04", "B08"] {
            touch(dir.path(), &sentinel_tile_name("T31TEJ", "20190118T104359", band));
            touch(dir.path(), &sentinel_tile_name("T31TEJ", "20190103T104431", band));
        }

        let index = scan_tiles(dir.path()).unwrap();
        assert_eq!(index.len(), 1);
        let path = index.get(TimeStep::new(2019, 1).unwrap(), Band::Blue).unwrap();
        assert!(path.to_string_lossy().contains("20190103T104431"));
    }

    #[test]
    fn test_scan_skips_jpeg2000_bands() {
        assert!(is_jpeg2000("T31TEJ_20190103T104431_B02_10m.JP2"));
        assert!(!is_jpeg2000("T31TEJ_20190103T104431_B02_10m.tif"));

        let dir = tempfile::tempdir().unwrap();
        for band in ["B02", "B03", "B04", "B08"] {
            touch(dir.path(), &format!("T31TEJ_20190103T104431_{band}_10m.jp2"));
            touch(dir.path(), &sentinel_tile_name("T31TEJ", "20200215T104019", band));
        }

        let index = scan_tiles(dir.path()).unwrap();
        let steps: Vec<TimeStep> = index.time_steps().collect();
        assert_eq!(steps, vec![TimeStep::new(2020, 2).unwrap()]);
    }

    #[test]
    fn test_scan_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_tiles(&dir.path().join("absent")).is_err());
    }
}
