//! Shared test fixtures for the geocdl workspace: common bounding boxes,
//! sample subset geometries, and a scratch directory helper, matching
//! `test-utils::fixtures`'s const-module layout.

pub mod bbox {
    /// Continental United States, WGS84 lon/lat.
    pub const CONUS: (f64, f64, f64, f64) = (-125.0, 24.0, -66.0, 50.0);

    /// A small single-county-sized test tile inside CONUS.
    pub const SMALL_TILE: (f64, f64, f64, f64) = (-100.0, 39.0, -99.0, 40.0);

    /// Outside any reference dataset's coverage — used to exercise
    /// `Dataset::get_data`'s sparse (`Ok(None)`) path.
    pub const OUTSIDE_CONUS: (f64, f64, f64, f64) = (40.0, 40.0, 41.0, 41.0);
}

use geo::{LineString, Point, Polygon};
use geocdl_common::{Crs, SubsetGeom, SubsetMultiPoint, SubsetPolygon};

/// Builds a closed rectangular ring polygon from `(min_x, min_y, max_x,
/// max_y)`, the same bbox tuple shape used throughout `geocdl-datasets`'
/// own coverage checks.
pub fn rect_polygon(bounds: (f64, f64, f64, f64), crs: Crs) -> SubsetGeom {
    let (min_x, min_y, max_x, max_y) = bounds;
    SubsetGeom::Polygon(SubsetPolygon {
        geom: Polygon::new(
            LineString::from(vec![(min_x, min_y), (max_x, min_y), (max_x, max_y), (min_x, max_y), (min_x, min_y)]),
            vec![],
        ),
        crs,
    })
}

/// Builds a multipoint subset geometry from a list of `(x, y)` coordinates.
pub fn multipoint(coords: &[(f64, f64)], crs: Crs) -> SubsetGeom {
    SubsetGeom::MultiPoint(SubsetMultiPoint {
        geom: geo::MultiPoint::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect()),
        crs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_polygon_is_closed() {
        let geom = rect_polygon(bbox::SMALL_TILE, Crs::wgs84());
        let SubsetGeom::Polygon(p) = geom else { panic!("expected polygon") };
        assert_eq!(p.geom.exterior().0.first(), p.geom.exterior().0.last());
    }

    #[test]
    fn multipoint_preserves_coordinate_count() {
        let geom = multipoint(&[(-100.0, 40.0), (-99.0, 41.0)], Crs::wgs84());
        let SubsetGeom::MultiPoint(mp) = geom else { panic!("expected multipoint") };
        assert_eq!(mp.geom.0.len(), 2);
    }
}
