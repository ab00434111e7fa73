//! Zipped shapefile parsing: locate the single `.shp`, require a matching
//! `.dbf`, accept optional `.shx`/`.prj`, matching
//! `upload_cache.py::_readZippedShapefile`/`_readShapefilePoints`/
//! `_readShapefilePolygon`.

use geo::{Coord, LineString, MultiPoint, Point, Polygon};
use geocdl_common::{Crs, GeoCdlError};
use std::io::{Cursor, Read};

/// The components of a zipped shapefile upload, extracted into memory.
pub struct ZippedShapefile {
    pub shp: Vec<u8>,
    pub dbf: Vec<u8>,
    pub shx: Option<Vec<u8>>,
    pub prj: Option<String>,
}

/// Unpacks a zip archive, requiring exactly one `.shp` with a matching
/// `.dbf` alongside it. Returns `None` if the archive has no shapefile
/// member at all, errors if the shapefile is incomplete.
pub fn read_zip(bytes: &[u8]) -> Result<Option<ZippedShapefile>, GeoCdlError> {
    let reader = Cursor::new(bytes);
    let mut zip = zip::ZipArchive::new(reader).map_err(|e| GeoCdlError::Internal(e.to_string()))?;

    let mut shp_name = None;
    for i in 0..zip.len() {
        let entry = zip.by_index(i).map_err(|e| GeoCdlError::Internal(e.to_string()))?;
        let name = entry.name().to_string();
        if name.to_lowercase().ends_with(".shp") {
            if shp_name.is_some() {
                return Err(GeoCdlError::UploadNotParseable);
            }
            shp_name = Some(name);
        }
    }
    let Some(shp_name) = shp_name else {
        return Ok(None);
    };
    let stem = shp_name.trim_end_matches(".shp").trim_end_matches(".SHP").to_string();

    let mut shp = None;
    let mut dbf = None;
    let mut shx = None;
    let mut prj = None;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| GeoCdlError::Internal(e.to_string()))?;
        let name = entry.name().to_string();
        if !name.starts_with(&stem) {
            continue;
        }
        let lower = name.to_lowercase();
        let mut buf = Vec::new();
        if lower.ends_with(".shp") {
            entry.read_to_end(&mut buf).map_err(GeoCdlError::Io)?;
            shp = Some(buf);
        } else if lower.ends_with(".dbf") {
            entry.read_to_end(&mut buf).map_err(GeoCdlError::Io)?;
            dbf = Some(buf);
        } else if lower.ends_with(".shx") {
            entry.read_to_end(&mut buf).map_err(GeoCdlError::Io)?;
            shx = Some(buf);
        } else if lower.ends_with(".prj") {
            let mut s = String::new();
            entry.read_to_string(&mut s).map_err(GeoCdlError::Io)?;
            prj = Some(s);
        }
    }

    let (Some(shp), Some(dbf)) = (shp, dbf) else {
        return Err(GeoCdlError::UploadNotParseable);
    };
    // Require the attribute table to actually parse, matching the reference
    // implementation's expectation of a well-formed .dbf sidecar.
    dbase::Reader::new(Cursor::new(dbf.clone())).map_err(|_| GeoCdlError::UploadNotParseable)?;
    Ok(Some(ZippedShapefile { shp, dbf, shx, prj }))
}

/// Best-effort CRS resolution from a `.prj` WKT string, matching the
/// handful of CRSs this workspace understands. Unrecognized WKT falls back
/// to `None` (the caller may still have a user-supplied CRS override).
pub fn crs_from_prj(prj: &str) -> Option<Crs> {
    let upper = prj.to_uppercase();
    if upper.contains("NAD83") {
        Some(Crs::nad83())
    } else if upper.contains("WGS_1984") || upper.contains("WGS84") {
        Some(Crs::wgs84())
    } else if upper.contains("PSEUDO-MERCATOR") || upper.contains("WEB_MERCATOR") {
        Some(Crs::web_mercator())
    } else if upper.contains("ALBERS") {
        Some(Crs::conus_albers())
    } else {
        None
    }
}

pub fn read_points(shp: &[u8]) -> Result<MultiPoint<f64>, GeoCdlError> {
    let cursor = Cursor::new(shp.to_vec());
    let mut reader =
        shapefile::ShapeReader::new(cursor).map_err(|e| GeoCdlError::Internal(e.to_string()))?;
    let mut points = Vec::new();
    for shape in reader.iter_shapes() {
        let shape = shape.map_err(|e| GeoCdlError::Internal(e.to_string()))?;
        match shape {
            shapefile::Shape::Point(p) => points.push(Point::new(p.x, p.y)),
            shapefile::Shape::Multipoint(mp) => {
                points.extend(mp.points().iter().map(|p| Point::new(p.x, p.y)))
            }
            other => {
                return Err(GeoCdlError::UnsupportedGeomType(format!("{:?}", other.shapetype())));
            }
        }
    }
    Ok(MultiPoint::new(points))
}

pub fn read_polygon(shp: &[u8]) -> Result<Polygon<f64>, GeoCdlError> {
    let cursor = Cursor::new(shp.to_vec());
    let mut reader =
        shapefile::ShapeReader::new(cursor).map_err(|e| GeoCdlError::Internal(e.to_string()))?;
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for shape in reader.iter_shapes() {
        let shape = shape.map_err(|e| GeoCdlError::Internal(e.to_string()))?;
        match shape {
            shapefile::Shape::Polygon(poly) => {
                for ring in poly.rings() {
                    if let shapefile::PolygonRing::Outer(pts) = ring {
                        let coords: Vec<Coord<f64>> =
                            pts.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
                        polygons.push(Polygon::new(LineString::new(coords), vec![]));
                    }
                }
            }
            other => {
                return Err(GeoCdlError::UnsupportedGeomType(format!("{:?}", other.shapetype())));
            }
        }
    }
    if polygons.len() > 1 {
        return Err(GeoCdlError::MultiPolyUnsupported);
    }
    polygons.pop().ok_or(GeoCdlError::UploadNotParseable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crs_from_prj_matches_nad83() {
        let prj = "GEOGCS[\"GCS_North_American_1983\",DATUM[\"D_North_American_1983\",...]]";
        assert_eq!(crs_from_prj(prj), Some(Crs::nad83()));
    }

    #[test]
    fn crs_from_prj_unknown_returns_none() {
        assert!(crs_from_prj("GEOGCS[\"Mars_2000\"]").is_none());
    }
}
