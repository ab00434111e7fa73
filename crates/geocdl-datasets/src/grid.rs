//! Shared helpers for synthesizing deterministic raster/point data from a
//! subset geometry's bounding box, standing in for the GDAL/NetCDF file
//! reads the reference `getData` implementations perform. The *shape* of
//! each dataset's pipeline (grid clip vs point interpolation, CRS check,
//! per-grain file selection) is what's grounded in the original; the pixel
//! values themselves are a reproducible synthetic field.

use geo::algorithm::bounding_rect::BoundingRect;
use geocdl_common::{PointLayer, PointValue, RasterLayer, RequestDate, SubsetGeom};

/// Builds a raster over `geom`'s bounding box at `pixel_size`, evaluating
/// `f(x, y, year) -> value` per cell center. `date` contributes only its
/// year so annual/monthly/daily requests over the same bbox vary smoothly.
pub fn synth_raster(
    geom: &SubsetGeom,
    pixel_size: f64,
    date: Option<RequestDate>,
    f: impl Fn(f64, f64, i32) -> f64,
) -> RasterLayer {
    let rect = bounds_of(geom);
    let (min_x, min_y, max_x, max_y) = rect;
    let width = (((max_x - min_x) / pixel_size).ceil() as usize).max(1);
    let height = (((max_y - min_y) / pixel_size).ceil() as usize).max(1);
    let year = date.map(|d| d.year).unwrap_or(0);

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let y = max_y - (row as f64 + 0.5) * pixel_size;
        for col in 0..width {
            let x = min_x + (col as f64 + 0.5) * pixel_size;
            data.push(f(x, y, year));
        }
    }

    RasterLayer {
        data,
        width,
        height,
        crs: geom.crs().clone(),
        geotransform: [min_x, pixel_size, 0.0, max_y, 0.0, -pixel_size],
        nodata: Some(f64::NAN),
    }
}

/// Evaluates `f(x, y, year)` at every coordinate in `geom` (a multipoint).
/// Panics if `geom` is not a multipoint; callers only reach this after
/// `Dataset::get_data` has dispatched on the geometry kind.
pub fn synth_points(geom: &SubsetGeom, date: Option<RequestDate>, f: impl Fn(f64, f64, i32) -> f64) -> PointLayer {
    let SubsetGeom::MultiPoint(mp) = geom else {
        unreachable!("synth_points called with a non-multipoint geometry");
    };
    let year = date.map(|d| d.year).unwrap_or(0);
    let values = mp
        .geom
        .iter()
        .map(|p| PointValue {
            x: p.x(),
            y: p.y(),
            value: Some(f(p.x(), p.y(), year)),
        })
        .collect();
    PointLayer { crs: mp.crs.clone(), values }
}

fn bounds_of(geom: &SubsetGeom) -> (f64, f64, f64, f64) {
    match geom {
        SubsetGeom::Polygon(p) => {
            let rect = p.geom.bounding_rect().expect("polygon has no bounding rect");
            (rect.min().x, rect.min().y, rect.max().x, rect.max().y)
        }
        SubsetGeom::MultiPoint(m) => {
            let rect = m.geom.bounding_rect().expect("multipoint has no bounding rect");
            (rect.min().x, rect.min().y, rect.max().x, rect.max().y)
        }
    }
}

/// Whether `geom`'s bounding box intersects `cover` (`min_x, min_y, max_x,
/// max_y`), used by datasets with a known real-world extent (e.g. PRISM's
/// CONUS-only coverage) to decide whether to return sparse (`None`) data.
pub fn bbox_intersects(geom: &SubsetGeom, cover: (f64, f64, f64, f64)) -> bool {
    let (min_x, min_y, max_x, max_y) = bounds_of(geom);
    let (cmin_x, cmin_y, cmax_x, cmax_y) = cover;
    min_x <= cmax_x && max_x >= cmin_x && min_y <= cmax_y && max_y >= cmin_y
}
