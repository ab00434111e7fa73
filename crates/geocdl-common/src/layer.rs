//! The data a single `Dataset::get_data` call returns: a raster grid or a
//! set of interpolated point values, plus the categorical metadata (RAT,
//! colormap) that travels with either.

use crate::crs::Crs;
use crate::types::Rgba;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single-band raster clipped/resampled to a dataset's native grid (or
/// the request's harmonized grid, once reprojection-matched).
#[derive(Debug, Clone)]
pub struct RasterLayer {
    /// Row-major pixel values, `width * height` long.
    pub data: Vec<f64>,
    pub width: usize,
    pub height: usize,
    pub crs: Crs,
    /// GDAL-style affine geotransform: `[origin_x, pixel_w, 0.0, origin_y, 0.0, pixel_h]`.
    /// `pixel_h` is negative (north-up rasters).
    pub geotransform: [f64; 6],
    pub nodata: Option<f64>,
}

impl RasterLayer {
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Whether `self` shares shape, CRS, and pixel grid with `other` — the
    /// harmonization-alignment invariant (Testable Property 5).
    pub fn matches_grid(&self, other: &RasterLayer) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.crs == other.crs
            && geotransform_close(&self.geotransform, &other.geotransform)
    }

    pub fn pixel_size(&self) -> (f64, f64) {
        (self.geotransform[1], self.geotransform[5])
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.width + col]
    }
}

fn geotransform_close(a: &[f64; 6], b: &[f64; 6]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
}

/// A single interpolated value at a request multipoint coordinate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointValue {
    pub x: f64,
    pub y: f64,
    pub value: Option<f64>,
}

/// Interpolated values at every coordinate of a request's multipoint
/// subset geometry, for one dataset/variable/date.
#[derive(Debug, Clone)]
pub struct PointLayer {
    pub crs: Crs,
    pub values: Vec<PointValue>,
}

/// Per-variable categorical metadata: integer code -> class name and
/// integer code -> display color. Travels with every output layer for a
/// categorical variable (§4.5.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoricalMeta {
    pub rat: BTreeMap<i64, String>,
    pub colormap: BTreeMap<i64, Rgba>,
}

impl CategoricalMeta {
    pub fn is_empty(&self) -> bool {
        self.rat.is_empty() && self.colormap.is_empty()
    }
}

/// What a `Dataset::get_data` call produces for one variable/date: either a
/// raster or a set of point values. `Dataset::get_data` itself returns
/// `Option<DataLayer>`; `None` means "data sparse here" and the layer is
/// silently omitted.
#[derive(Debug, Clone)]
pub enum DataLayer {
    Raster(RasterLayer),
    Point(PointLayer),
}

impl DataLayer {
    pub fn crs(&self) -> &Crs {
        match self {
            DataLayer::Raster(r) => &r.crs,
            DataLayer::Point(p) => &p.crs,
        }
    }

    pub fn as_raster(&self) -> Option<&RasterLayer> {
        match self {
            DataLayer::Raster(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<&PointLayer> {
        match self {
            DataLayer::Point(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;

    fn raster(gt: [f64; 6]) -> RasterLayer {
        RasterLayer {
            data: vec![0.0; 4],
            width: 2,
            height: 2,
            crs: Crs::wgs84(),
            geotransform: gt,
            nodata: None,
        }
    }

    #[test]
    fn matches_grid_requires_identical_geotransform() {
        let a = raster([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]);
        let b = raster([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]);
        let c = raster([0.0, 2.0, 0.0, 0.0, 0.0, -1.0]);
        assert!(a.matches_grid(&b));
        assert!(!a.matches_grid(&c));
    }

    #[test]
    fn categorical_meta_empty_when_unset() {
        assert!(CategoricalMeta::default().is_empty());
    }
}
