//! GeoJSON point/polygon extraction, recursing through
//! `GeometryCollection`/`Feature`/`FeatureCollection` wrappers the way
//! `upload_cache.py::_extractGeoJSONCoords`/`_extractGeoJSONPolygon` do.

use geo::{Coord, LineString, MultiPoint, Point, Polygon};
use geocdl_common::GeoCdlError;
use geojson::{GeoJson, Geometry, Value};

/// Recursively collects every `Point`/`MultiPoint` coordinate reachable
/// from `gj`. Returns an empty vec if none are found, matching the
/// reference implementation's "fall through to the next parser" behavior
/// rather than erroring here.
pub fn extract_points(gj: &GeoJson) -> Vec<Point<f64>> {
    match gj {
        GeoJson::Geometry(g) => extract_points_from_geometry(g),
        GeoJson::Feature(f) => f.geometry.as_ref().map(extract_points_from_geometry).unwrap_or_default(),
        GeoJson::FeatureCollection(fc) => fc
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .flat_map(extract_points_from_geometry)
            .collect(),
    }
}

fn extract_points_from_geometry(g: &Geometry) -> Vec<Point<f64>> {
    match &g.value {
        Value::Point(c) => vec![Point::new(c[0], c[1])],
        Value::MultiPoint(cs) => cs.iter().map(|c| Point::new(c[0], c[1])).collect(),
        Value::GeometryCollection(geoms) => geoms.iter().flat_map(extract_points_from_geometry).collect(),
        _ => Vec::new(),
    }
}

/// Recursively locates a single polygon ring set reachable from `gj`,
/// matching `_extractGeoJSONPolygon`: a lone `Polygon`, or a `MultiPolygon`
/// containing exactly one polygon. Multiple polygons is an explicit error
/// (`MultiPolyUnsupported`), not a silent first-wins pick.
pub fn extract_polygon(gj: &GeoJson) -> Result<Option<Polygon<f64>>, GeoCdlError> {
    match gj {
        GeoJson::Geometry(g) => extract_polygon_from_geometry(g),
        GeoJson::Feature(f) => match &f.geometry {
            Some(g) => extract_polygon_from_geometry(g),
            None => Ok(None),
        },
        GeoJson::FeatureCollection(fc) => {
            let mut found = None;
            for feat in &fc.features {
                if let Some(g) = &feat.geometry {
                    if let Some(p) = extract_polygon_from_geometry(g)? {
                        if found.is_some() {
                            return Err(GeoCdlError::MultiPolyUnsupported);
                        }
                        found = Some(p);
                    }
                }
            }
            Ok(found)
        }
    }
}

fn extract_polygon_from_geometry(g: &Geometry) -> Result<Option<Polygon<f64>>, GeoCdlError> {
    match &g.value {
        Value::Polygon(rings) => Ok(Some(ring_to_polygon(rings))),
        Value::MultiPolygon(polys) => {
            if polys.len() > 1 {
                return Err(GeoCdlError::MultiPolyUnsupported);
            }
            Ok(polys.first().map(|rings| ring_to_polygon(rings)))
        }
        Value::GeometryCollection(geoms) => {
            let mut found = None;
            for inner in geoms {
                if let Some(p) = extract_polygon_from_geometry(inner)? {
                    if found.is_some() {
                        return Err(GeoCdlError::MultiPolyUnsupported);
                    }
                    found = Some(p);
                }
            }
            Ok(found)
        }
        _ => Ok(None),
    }
}

fn ring_to_polygon(rings: &[Vec<Vec<f64>>]) -> Polygon<f64> {
    let outer = &rings[0];
    let coords: Vec<Coord<f64>> = outer.iter().map(|c| Coord { x: c[0], y: c[1] }).collect();
    Polygon::new(LineString::new(coords), vec![])
}

pub fn multipoint_of(points: Vec<Point<f64>>) -> MultiPoint<f64> {
    MultiPoint::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_multipoint_geometry() {
        let gj: GeoJson = r#"{"type":"MultiPoint","coordinates":[[1,2],[3,4]]}"#.parse().unwrap();
        let pts = extract_points(&gj);
        assert_eq!(pts.len(), 2);
    }

    #[test]
    fn extracts_points_from_feature_collection() {
        let gj: GeoJson = r#"{
            "type":"FeatureCollection",
            "features":[
                {"type":"Feature","geometry":{"type":"Point","coordinates":[1,2]},"properties":{}},
                {"type":"Feature","geometry":{"type":"Point","coordinates":[3,4]},"properties":{}}
            ]
        }"#
        .parse()
        .unwrap();
        assert_eq!(extract_points(&gj).len(), 2);
    }

    #[test]
    fn extracts_single_polygon() {
        let gj: GeoJson = r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#.parse().unwrap();
        let poly = extract_polygon(&gj).unwrap().unwrap();
        assert_eq!(poly.exterior().0.len(), 5);
    }

    #[test]
    fn rejects_multiple_polygons_in_feature_collection() {
        let gj: GeoJson = r#"{
            "type":"FeatureCollection",
            "features":[
                {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]},"properties":{}},
                {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[5,5],[6,5],[6,6],[5,6],[5,5]]]},"properties":{}}
            ]
        }"#
        .parse()
        .unwrap();
        assert!(matches!(extract_polygon(&gj), Err(GeoCdlError::MultiPolyUnsupported)));
    }
}
