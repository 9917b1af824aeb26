//! Labelled polygon sets and their GeoJSON loader.

use std::path::Path;

use cube_common::{Crs, PotentialClass};
use geo::{Coord, MapCoords, MultiPolygon};
use geojson::{FeatureCollection, GeoJson};
use projection::CrsTransform;
use tracing::{debug, warn};

use crate::error::{CubeError, Result};

/// One areal feature with its label class.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPolygon {
    pub geometry: MultiPolygon<f64>,
    pub label: PotentialClass,
}

/// A read-only set of labelled polygons, all in one CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSet {
    pub crs: Crs,
    pub polygons: Vec<LabeledPolygon>,
}

/// Counters from loading a vector file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub null_geometry: usize,
    pub non_areal: usize,
    pub unlabeled: usize,
}

impl PolygonSet {
    pub fn new(crs: Crs, polygons: Vec<LabeledPolygon>) -> Self {
        Self { crs, polygons }
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Polygons carrying `label`.
    pub fn with_label(&self, label: PotentialClass) -> impl Iterator<Item = &LabeledPolygon> {
        self.polygons.iter().filter(move |p| p.label == label)
    }

    /// Whether any polygon carries one of `labels`.
    pub fn has_any_label(&self, labels: &[PotentialClass]) -> bool {
        self.polygons.iter().any(|p| labels.contains(&p.label))
    }

    /// Copy of this set with every vertex moved into `target`.
    pub fn reprojected(&self, target: Crs) -> Result<PolygonSet> {
        if target == self.crs {
            return Ok(self.clone());
        }

        let transform = CrsTransform::new(self.crs, target)?;
        let polygons = self
            .polygons
            .iter()
            .map(|p| {
                let geometry = p.geometry.try_map_coords(|c: Coord<f64>| {
                    transform.transform(c.x, c.y).map(|(x, y)| Coord { x, y })
                })?;
                Ok(LabeledPolygon {
                    geometry,
                    label: p.label,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(from = %self.crs, to = %target, count = polygons.len(), "Reprojected polygons");
        Ok(PolygonSet::new(target, polygons))
    }

    /// Read a GeoJSON file.
    pub fn from_geojson_file(path: &Path, label_property: &str) -> Result<(Self, LoadSummary)> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CubeError::io(format!("{}: {}", path.display(), e)))?;
        Self::from_geojson_str(&text, label_property)
            .map_err(|e| match e {
                CubeError::Format(msg) => CubeError::format(format!("{}: {}", path.display(), msg)),
                other => other,
            })
    }

    /// Parse GeoJSON text.
    ///
    /// Coordinates are EPSG:4326 unless the collection carries a legacy
    /// named `crs` member. Features without geometry are skipped, points and
    /// lines are skipped with a warning, and features whose label is not one
    /// of the known classes are ignored.
    pub fn from_geojson_str(text: &str, label_property: &str) -> Result<(Self, LoadSummary)> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| CubeError::format(format!("invalid GeoJSON: {}", e)))?;

        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            GeoJson::Feature(f) => FeatureCollection {
                bbox: None,
                features: vec![f],
                foreign_members: None,
            },
            GeoJson::Geometry(_) => {
                return Err(CubeError::format(
                    "expected a Feature or FeatureCollection, found a bare geometry",
                ))
            }
        };

        let crs = declared_crs(&collection)?.unwrap_or(Crs::WGS84);
        let mut summary = LoadSummary::default();
        let mut polygons = Vec::new();

        for (index, feature) in collection.features.into_iter().enumerate() {
            let label = feature
                .property(label_property)
                .and_then(|v| v.as_str())
                .and_then(PotentialClass::from_label);

            let Some(geometry) = feature.geometry else {
                summary.null_geometry += 1;
                continue;
            };

            let geometry = geo::Geometry::<f64>::try_from(geometry.value)
                .map_err(|e| CubeError::format(format!("feature {}: {}", index, e)))?;

            let geometry = match geometry {
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Rect(r) => MultiPolygon::new(vec![r.to_polygon()]),
                other => {
                    warn!(feature = index, kind = geometry_kind(&other), "Skipping non-areal feature");
                    summary.non_areal += 1;
                    continue;
                }
            };

            let Some(label) = label else {
                summary.unlabeled += 1;
                continue;
            };

            polygons.push(LabeledPolygon { geometry, label });
        }

        summary.loaded = polygons.len();
        debug!(
            crs = %crs,
            loaded = summary.loaded,
            null_geometry = summary.null_geometry,
            non_areal = summary.non_areal,
            unlabeled = summary.unlabeled,
            "Loaded polygon set"
        );

        Ok((PolygonSet::new(crs, polygons), summary))
    }
}

/// CRS named by a legacy (2008 spec) `crs` member, if any.
fn declared_crs(collection: &FeatureCollection) -> Result<Option<Crs>> {
    let Some(crs) = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
    else {
        return Ok(None);
    };

    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .ok_or_else(|| CubeError::format("crs member has no properties.name"))?;

    Ok(Some(name.parse()?))
}

fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Triangle(_) => "Triangle",
        geo::Geometry::Polygon(_) | geo::Geometry::MultiPolygon(_) | geo::Geometry::Rect(_) => {
            "Polygon"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"pot_global": "Limite"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type": "Feature", "properties": {"pot_global": "Moyen"},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[2,2],[3,2],[3,3],[2,2]]]]}},
            {"type": "Feature", "properties": {"pot_global": "Inconnu"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
            {"type": "Feature", "properties": {"pot_global": "Moyen"}, "geometry": null},
            {"type": "Feature", "properties": {"pot_global": "Moyen"},
             "geometry": {"type": "Point", "coordinates": [0.5, 0.5]}}
        ]
    }"#;

    #[test]
    fn test_load_counts() {
        let (set, summary) = PolygonSet::from_geojson_str(SAMPLE, "pot_global").unwrap();
        assert_eq!(set.crs, Crs::WGS84);
        assert_eq!(set.len(), 2);
        assert_eq!(
            summary,
            LoadSummary {
                loaded: 2,
                null_geometry: 1,
                non_areal: 1,
                unlabeled: 1,
            }
        );
        assert_eq!(set.with_label(PotentialClass::Moyen).count(), 1);
        assert!(set.has_any_label(&[PotentialClass::Limite]));
        assert!(!set.has_any_label(&[PotentialClass::AssezFort]));
    }

    #[test]
    fn test_custom_label_property() {
        let text = SAMPLE.replace("pot_global", "classe");
        let (set, _) = PolygonSet::from_geojson_str(&text, "classe").unwrap();
        assert_eq!(set.len(), 2);

        let (set, summary) = PolygonSet::from_geojson_str(&text, "pot_global").unwrap();
        assert!(set.is_empty());
        assert_eq!(summary.unlabeled, 3);
    }

    #[test]
    fn test_legacy_crs_member() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32631"}},
            "features": []
        }"#;
        let (set, _) = PolygonSet::from_geojson_str(text, "pot_global").unwrap();
        assert_eq!(set.crs, Crs::epsg(32631));
    }

    #[test]
    fn test_invalid_geojson() {
        let err = PolygonSet::from_geojson_str("{not json", "pot_global").unwrap_err();
        assert!(matches!(err, CubeError::Format(_)));
    }

    #[test]
    fn test_reproject_to_utm() {
        let (set, _) = PolygonSet::from_geojson_str(SAMPLE, "pot_global").unwrap();
        let utm = set.reprojected(Crs::epsg(32631)).unwrap();
        assert_eq!(utm.crs, Crs::epsg(32631));
        assert_eq!(utm.len(), set.len());

        // (1, 0) lies 2 degrees west of the zone's central meridian on the equator
        let first = &utm.polygons[0].geometry.0[0].exterior().0[1];
        assert!(first.x > 270000.0 && first.x < 280000.0, "x = {}", first.x);
        assert!(first.y.abs() < 1e-3);
    }
}
