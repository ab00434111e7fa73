//! Raster reprojection, reprojection-matching (harmonization), and
//! clip-to-polygon, grounded in `data_request_handler.py`'s post-`getData`
//! resampling step (the `rioxarray.reproject`/`reproject_match` calls) but
//! implemented as closed-form nearest-neighbor resampling through
//! [`geocdl_common::Crs::transform_point`], since a general-purpose
//! resampling library is the explicitly out-of-scope collaborator (§1).

use geocdl_common::{Crs, RasterLayer, SubsetPolygon};

/// The grid identity two rasters must share to be considered harmonized
/// (Testable Property 5): shape, CRS, and pixel grid. Captured once from
/// the first successfully produced raster in a request and used as the
/// resampling target for every subsequent one.
#[derive(Debug, Clone)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    pub crs: Crs,
    pub geotransform: [f64; 6],
    pub nodata: Option<f64>,
}

impl GridSpec {
    pub fn from_raster(layer: &RasterLayer) -> Self {
        GridSpec {
            width: layer.width,
            height: layer.height,
            crs: layer.crs.clone(),
            geotransform: layer.geotransform,
            nodata: layer.nodata,
        }
    }

    fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.geotransform[0] + (col as f64 + 0.5) * self.geotransform[1];
        let y = self.geotransform[3] + (row as f64 + 0.5) * self.geotransform[5];
        (x, y)
    }
}

/// Reprojects (and, if `target_resolution` is set, resamples) `layer` into
/// `target_crs`, by reprojecting its bounding box and resampling each
/// output cell's center back into the source CRS with nearest-neighbor
/// lookup. A no-op clone if the CRS already matches and no resolution was
/// requested.
pub fn reproject_raster(layer: &RasterLayer, target_crs: &Crs, target_resolution: Option<f64>) -> RasterLayer {
    if layer.crs == *target_crs && target_resolution.is_none() {
        return layer.clone();
    }

    let (src_min_x, src_min_y, src_max_x, src_max_y) = layer_bounds(layer);
    let corners = [
        (src_min_x, src_min_y),
        (src_max_x, src_min_y),
        (src_max_x, src_max_y),
        (src_min_x, src_max_y),
    ];
    let mut min_x = f64::MAX;
    let mut max_x = f64::MIN;
    let mut min_y = f64::MAX;
    let mut max_y = f64::MIN;
    for (x, y) in corners {
        let (tx, ty) = layer.crs.transform_point(target_crs, x, y);
        min_x = min_x.min(tx);
        max_x = max_x.max(tx);
        min_y = min_y.min(ty);
        max_y = max_y.max(ty);
    }

    let (src_px, src_py) = layer.pixel_size();
    let pixel_size = target_resolution.unwrap_or_else(|| src_px.abs());
    let width = (((max_x - min_x) / pixel_size).ceil() as usize).max(1);
    let height = (((max_y - min_y) / pixel_size).ceil() as usize).max(1);
    let geotransform = [min_x, pixel_size, 0.0, max_y, 0.0, -pixel_size];

    let grid = GridSpec {
        width,
        height,
        crs: target_crs.clone(),
        geotransform,
        nodata: layer.nodata,
    };
    resample_nearest(layer, &grid)
}

/// Resamples `layer` onto `anchor`'s exact grid — the harmonization step
/// applied to every raster after the first (Testable Property 5).
pub fn reproject_match(layer: &RasterLayer, anchor: &GridSpec) -> RasterLayer {
    resample_nearest(layer, anchor)
}

fn resample_nearest(layer: &RasterLayer, grid: &GridSpec) -> RasterLayer {
    let nodata = grid.nodata.or(layer.nodata).unwrap_or(f64::NAN);
    let mut data = vec![nodata; grid.width * grid.height];

    let (src_px, src_py) = layer.pixel_size();
    for row in 0..grid.height {
        for col in 0..grid.width {
            let (x, y) = grid.cell_center(row, col);
            let (sx, sy) = grid.crs.transform_point(&layer.crs, x, y);
            let src_col = ((sx - layer.geotransform[0]) / src_px).floor();
            let src_row = ((sy - layer.geotransform[3]) / src_py).floor();
            if src_col < 0.0 || src_row < 0.0 {
                continue;
            }
            let (src_col, src_row) = (src_col as usize, src_row as usize);
            if src_col >= layer.width || src_row >= layer.height {
                continue;
            }
            data[row * grid.width + col] = layer.get(src_row, src_col);
        }
    }

    RasterLayer {
        data,
        width: grid.width,
        height: grid.height,
        crs: grid.crs.clone(),
        geotransform: grid.geotransform,
        nodata: grid.nodata,
    }
}

/// Clips `layer` to `polygon` (in `layer`'s CRS), `all_touched = true`:
/// a cell is kept if its bounding box intersects the polygon, not only if
/// its center falls inside it, matching the reference's
/// `rioxarray.clip(..., all_touched=True)` call after reprojection.
pub fn clip_all_touched(layer: &RasterLayer, polygon: &SubsetPolygon) -> RasterLayer {
    use geo::algorithm::bounding_rect::BoundingRect;
    use geo::algorithm::intersects::Intersects;
    use geo::{Coord, LineString, Polygon as GeoPolygon};

    let nodata = layer.nodata.unwrap_or(f64::NAN);
    let mut data = layer.data.clone();
    let (px, py) = layer.pixel_size();

    for row in 0..layer.height {
        for col in 0..layer.width {
            let x0 = layer.geotransform[0] + col as f64 * px;
            let y0 = layer.geotransform[3] + row as f64 * py;
            let cell = GeoPolygon::new(
                LineString::new(vec![
                    Coord { x: x0, y: y0 },
                    Coord { x: x0 + px, y: y0 },
                    Coord { x: x0 + px, y: y0 + py },
                    Coord { x: x0, y: y0 + py },
                    Coord { x: x0, y: y0 },
                ]),
                vec![],
            );
            let keep = cell.bounding_rect().map(|_| cell.intersects(&polygon.geom)).unwrap_or(false);
            if !keep {
                data[row * layer.width + col] = nodata;
            }
        }
    }

    RasterLayer { data, nodata: Some(nodata), ..layer.clone() }
}

fn layer_bounds(layer: &RasterLayer) -> (f64, f64, f64, f64) {
    let (px, py) = layer.pixel_size();
    let x0 = layer.geotransform[0];
    let y0 = layer.geotransform[3];
    let x1 = x0 + layer.width as f64 * px;
    let y1 = y0 + layer.height as f64 * py;
    (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
}
