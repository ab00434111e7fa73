//! [`SubsetGeom`]: a CRS-tagged polygon or multipoint subset geometry.

use crate::crs::Crs;
use crate::error::{GeoCdlError, GeoCdlResult};
use geo::algorithm::convex_hull::ConvexHull;
use geo::{Coord, LineString, MultiPoint, Point, Polygon};
use geojson::{Geometry, Value};
use serde::{Deserialize, Serialize};

/// A CRS-aware subset geometry: either a single polygon or a set of points.
///
/// `reproject` is pure and returns a new value; it never mutates `self`.
#[derive(Debug, Clone)]
pub enum SubsetGeom {
    Polygon(SubsetPolygon),
    MultiPoint(SubsetMultiPoint),
}

#[derive(Debug, Clone)]
pub struct SubsetPolygon {
    pub geom: Polygon<f64>,
    pub crs: Crs,
}

#[derive(Debug, Clone)]
pub struct SubsetMultiPoint {
    pub geom: MultiPoint<f64>,
    pub crs: Crs,
}

impl SubsetGeom {
    pub fn crs(&self) -> &Crs {
        match self {
            SubsetGeom::Polygon(p) => &p.crs,
            SubsetGeom::MultiPoint(m) => &m.crs,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SubsetGeom::Polygon(_) => "Polygon",
            SubsetGeom::MultiPoint(_) => "MultiPoint",
        }
    }

    /// Parse a GeoJSON `Polygon` or `MultiPoint` geometry together with a
    /// CRS string, matching the reference `SubsetGeom` constructor.
    pub fn from_geojson(geom: &Geometry, crs: &Crs) -> GeoCdlResult<Self> {
        match &geom.value {
            Value::Polygon(rings) => {
                let outer = rings
                    .first()
                    .ok_or_else(|| GeoCdlError::UnsupportedGeomType("Polygon".into()))?;
                let coords: Vec<Coord<f64>> = outer.iter().map(|c| Coord { x: c[0], y: c[1] }).collect();
                let poly = Polygon::new(LineString::new(coords), vec![]);
                Ok(SubsetGeom::Polygon(SubsetPolygon {
                    geom: poly,
                    crs: crs.clone(),
                }))
            }
            Value::MultiPolygon(polys) => {
                if polys.len() > 1 {
                    return Err(GeoCdlError::MultiPolyUnsupported);
                }
                let rings = polys.first().ok_or_else(|| GeoCdlError::UnsupportedGeomType("MultiPolygon".into()))?;
                let outer = rings.first().ok_or_else(|| GeoCdlError::UnsupportedGeomType("MultiPolygon".into()))?;
                let coords: Vec<Coord<f64>> = outer.iter().map(|c| Coord { x: c[0], y: c[1] }).collect();
                let poly = Polygon::new(LineString::new(coords), vec![]);
                Ok(SubsetGeom::Polygon(SubsetPolygon {
                    geom: poly,
                    crs: crs.clone(),
                }))
            }
            Value::MultiPoint(points) => {
                let pts: Vec<Point<f64>> = points.iter().map(|c| Point::new(c[0], c[1])).collect();
                Ok(SubsetGeom::MultiPoint(SubsetMultiPoint {
                    geom: MultiPoint::new(pts),
                    crs: crs.clone(),
                }))
            }
            other => Err(GeoCdlError::UnsupportedGeomType(format!("{:?}", other))),
        }
    }

    /// Returns a new `SubsetGeom` with coordinates transformed into
    /// `target_crs`. Does not mutate `self`.
    pub fn reproject(&self, target_crs: &Crs) -> SubsetGeom {
        match self {
            SubsetGeom::Polygon(p) => SubsetGeom::Polygon(p.reproject(target_crs)),
            SubsetGeom::MultiPoint(m) => SubsetGeom::MultiPoint(m.reproject(target_crs)),
        }
    }

    /// Buffers this geometry outward by `width` (in this geometry's CRS
    /// units). Only defined for polygons.
    pub fn buffer(&self, width: f64) -> GeoCdlResult<SubsetGeom> {
        match self {
            SubsetGeom::Polygon(p) => Ok(SubsetGeom::Polygon(p.buffer(width))),
            SubsetGeom::MultiPoint(_) => Err(GeoCdlError::BufferNotSupported),
        }
    }

    /// GeoJSON representation, as used for both the `.json` clip embedded
    /// in requests and upload-cache round-tripping.
    pub fn to_geojson(&self) -> Geometry {
        match self {
            SubsetGeom::Polygon(p) => p.to_geojson(),
            SubsetGeom::MultiPoint(m) => m.to_geojson(),
        }
    }
}

impl SubsetPolygon {
    pub fn reproject(&self, target_crs: &Crs) -> SubsetPolygon {
        let coords: Vec<Coord<f64>> = self
            .geom
            .exterior()
            .coords()
            .map(|c| {
                let (x, y) = self.crs.transform_point(target_crs, c.x, c.y);
                Coord { x, y }
            })
            .collect();
        SubsetPolygon {
            geom: Polygon::new(LineString::new(coords), vec![]),
            crs: target_crs.clone(),
        }
    }

    /// Approximate outward buffer: the convex hull of the polygon, with
    /// each hull vertex pushed outward along the bisector of its adjacent
    /// edge normals by `width`. This over-approximates a true Euclidean
    /// buffer (Minkowski sum), which is intentionally out of scope here —
    /// the buffer only needs to be large enough that harmonization/clip
    /// never drops edge pixels, so an over-approximation is safe.
    pub fn buffer(&self, width: f64) -> SubsetPolygon {
        if width <= 0.0 {
            return self.clone();
        }
        let hull = self.geom.convex_hull();
        let pts: Vec<Coord<f64>> = hull.exterior().coords().copied().collect();
        let n = pts.len();
        if n < 4 {
            return SubsetPolygon {
                geom: hull,
                crs: self.crs.clone(),
            };
        }
        // Closed ring: last point duplicates first. Work over the n-1
        // distinct vertices.
        let m = n - 1;
        let mut buffered = Vec::with_capacity(n);
        for i in 0..m {
            let prev = pts[(i + m - 1) % m];
            let cur = pts[i];
            let next = pts[(i + 1) % m];

            let edge_in = (cur.x - prev.x, cur.y - prev.y);
            let edge_out = (next.x - cur.x, next.y - cur.y);

            // Outward normal of each edge (rotate -90deg for a
            // counter-clockwise ring, which is what geo's convex_hull
            // produces).
            let normal_in = normalize((edge_in.1, -edge_in.0));
            let normal_out = normalize((edge_out.1, -edge_out.0));

            let bisector = normalize((normal_in.0 + normal_out.0, normal_in.1 + normal_out.1));
            let bisector = if bisector == (0.0, 0.0) { normal_in } else { bisector };

            buffered.push(Coord {
                x: cur.x + bisector.0 * width,
                y: cur.y + bisector.1 * width,
            });
        }
        buffered.push(buffered[0]);

        SubsetPolygon {
            geom: Polygon::new(LineString::new(buffered), vec![]),
            crs: self.crs.clone(),
        }
    }

    pub fn to_geojson(&self) -> Geometry {
        let ring: Vec<Vec<f64>> = self.geom.exterior().coords().map(|c| vec![c.x, c.y]).collect();
        Geometry::new(Value::Polygon(vec![ring]))
    }
}

impl SubsetMultiPoint {
    pub fn reproject(&self, target_crs: &Crs) -> SubsetMultiPoint {
        let pts: Vec<Point<f64>> = self
            .geom
            .iter()
            .map(|p| {
                let (x, y) = self.crs.transform_point(target_crs, p.x(), p.y());
                Point::new(x, y)
            })
            .collect();
        SubsetMultiPoint {
            geom: MultiPoint::new(pts),
            crs: target_crs.clone(),
        }
    }

    pub fn to_geojson(&self) -> Geometry {
        let coords: Vec<Vec<f64>> = self.geom.iter().map(|p| vec![p.x(), p.y()]).collect();
        Geometry::new(Value::MultiPoint(coords))
    }
}

fn normalize(v: (f64, f64)) -> (f64, f64) {
    let len = (v.0 * v.0 + v.1 * v.1).sqrt();
    if len < 1e-12 {
        (0.0, 0.0)
    } else {
        (v.0 / len, v.1 / len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeomKind {
    Polygon,
    MultiPoint,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;

    fn square() -> SubsetPolygon {
        SubsetPolygon {
            geom: Polygon::new(
                LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
                vec![],
            ),
            crs: Crs::web_mercator(),
        }
    }

    #[test]
    fn reproject_is_pure() {
        let poly = square();
        let target = Crs::wgs84();
        // CRSs differ here only in units, so this is just exercising that
        // `self` is untouched and a new CRS tag is attached.
        let reprojected = poly.reproject(&target);
        assert_eq!(poly.crs, Crs::web_mercator());
        assert_eq!(reprojected.crs, Crs::wgs84());
    }

    #[test]
    fn buffer_expands_bbox() {
        let poly = square();
        let buffered = poly.buffer(5.0);
        let (min_x, min_y, max_x, max_y) = bbox(&buffered.geom);
        assert!(min_x < 0.0 && min_y < 0.0);
        assert!(max_x > 10.0 && max_y > 10.0);
    }

    #[test]
    fn buffer_zero_is_identity() {
        let poly = square();
        let buffered = poly.buffer(0.0);
        assert_eq!(buffered.geom.exterior().coords().count(), poly.geom.exterior().coords().count());
    }

    fn bbox(p: &Polygon<f64>) -> (f64, f64, f64, f64) {
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for c in p.exterior().coords() {
            min_x = min_x.min(c.x);
            min_y = min_y.min(c.y);
            max_x = max_x.max(c.x);
            max_y = max_y.max(c.y);
        }
        (min_x, min_y, max_x, max_y)
    }
}
