//! TileSet (C3): indexes an on-disk collection of contiguous raster tiles
//! by bounding polygon, answers which tiles cover a query geometry, and
//! merges them into a single mosaic raster.
//!
//! Grounded in `library/datasets/tileset.py::TileSet`. Dataset-specific
//! decoding of each tile file is the out-of-scope collaborator (§1); this
//! crate only needs a tile's bounding box and, for `mosaic`, a already-read
//! [`RasterLayer`] per tile (supplied by the caller's tile reader).

use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::intersects::Intersects;
use geo::{Coord, LineString, Polygon};
use geocdl_common::{Crs, GeoCdlError, GeoCdlResult, RasterLayer, SubsetGeom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A tile's on-disk path paired with its bounding polygon, in the tile
/// set's CRS.
#[derive(Debug, Clone)]
struct Tile {
    poly: Polygon<f64>,
    path: PathBuf,
}

/// Indexes tile bounding boxes against on-disk paths. Invariant:
/// `polys.len() == paths.len()` is maintained structurally by storing one
/// [`Tile`] per entry rather than two parallel vectors.
pub struct TileSet {
    tiles: Vec<Tile>,
    crs: Crs,
}

/// A tile's bounding box, as the caller's file reader would report it:
/// `(path, min_x, min_y, max_x, max_y)`.
pub struct TileBounds {
    pub path: PathBuf,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl TileSet {
    /// Builds the index from each tile's bounding box. The caller is
    /// responsible for opening each tile file far enough to read its
    /// extent (the out-of-scope raster-decoding collaborator); this
    /// constructor only assembles the polygon index over the results.
    pub fn new(bounds: Vec<TileBounds>, crs: Crs) -> Self {
        let tiles = bounds
            .into_iter()
            .map(|b| {
                let coords = vec![
                    Coord { x: b.min_x, y: b.max_y },
                    Coord { x: b.max_x, y: b.max_y },
                    Coord { x: b.max_x, y: b.min_y },
                    Coord { x: b.min_x, y: b.min_y },
                    Coord { x: b.min_x, y: b.max_y },
                ];
                Tile { poly: Polygon::new(LineString::new(coords), vec![]), path: b.path }
            })
            .collect();
        TileSet { tiles, crs }
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The tile set's overall bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut acc: Option<(f64, f64, f64, f64)> = None;
        for tile in &self.tiles {
            let rect = tile.poly.bounding_rect()?;
            acc = Some(match acc {
                None => (rect.min().x, rect.min().y, rect.max().x, rect.max().y),
                Some((min_x, min_y, max_x, max_y)) => (
                    min_x.min(rect.min().x),
                    min_y.min(rect.min().y),
                    max_x.max(rect.max().x),
                    max_y.max(rect.max().y),
                ),
            });
        }
        acc
    }

    /// Paths of tiles whose bounding polygon intersects `subset_geom`.
    /// Errors with [`GeoCdlError::CrsMismatch`] if the geometry's CRS
    /// differs from this tile set's CRS, and [`GeoCdlError::NoTiles`] if
    /// nothing intersects.
    pub fn tiles_for(&self, subset_geom: &SubsetGeom) -> GeoCdlResult<Vec<&Path>> {
        if subset_geom.crs() != &self.crs {
            return Err(GeoCdlError::CrsMismatch);
        }

        let matches: Vec<&Path> = match subset_geom {
            SubsetGeom::Polygon(p) => {
                self.tiles.iter().filter(|t| t.poly.intersects(&p.geom)).map(|t| t.path.as_path()).collect()
            }
            SubsetGeom::MultiPoint(m) => {
                self.tiles.iter().filter(|t| t.poly.intersects(&m.geom)).map(|t| t.path.as_path()).collect()
            }
        };

        if matches.is_empty() {
            debug!(n_tiles = self.tiles.len(), "no tiles intersect requested geometry");
            return Err(GeoCdlError::NoTiles);
        }
        Ok(matches)
    }

    /// Merges already-read tile rasters into one mosaic over the union of
    /// their extents. Tiles are assumed to share `crs`/pixel size;
    /// resampling mismatched tiles is the out-of-scope collaborator's job
    /// (the dataset adapter that calls this already reprojected/aligned
    /// them). Later tiles in `layers` take precedence where they overlap,
    /// matching `rioxarray.merge.merge_arrays`'s default "first valid wins
    /// in input order" for the *first* input and letting callers order
    /// `layers` accordingly.
    pub fn mosaic(layers: Vec<RasterLayer>) -> GeoCdlResult<RasterLayer> {
        let first = layers.first().ok_or_else(|| GeoCdlError::Internal("mosaic called with no tiles".into()))?;
        let crs = first.crs.clone();
        let (px, py) = first.pixel_size();
        let nodata = first.nodata;

        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for l in &layers {
            let ox = l.geotransform[0];
            let oy = l.geotransform[3];
            xs.push(ox);
            xs.push(ox + l.width as f64 * l.geotransform[1]);
            ys.push(oy);
            ys.push(oy + l.height as f64 * l.geotransform[5]);
        }
        let mosaic_min_x = xs.iter().cloned().fold(f64::MAX, f64::min);
        let mosaic_max_x = xs.iter().cloned().fold(f64::MIN, f64::max);
        let mosaic_min_y = ys.iter().cloned().fold(f64::MAX, f64::min);
        let mosaic_max_y = ys.iter().cloned().fold(f64::MIN, f64::max);

        let width = ((mosaic_max_x - mosaic_min_x) / px).round().max(1.0) as usize;
        let height = ((mosaic_max_y - mosaic_min_y) / py.abs()).round().max(1.0) as usize;
        let mut data = vec![nodata.unwrap_or(f64::NAN); width * height];

        for layer in &layers {
            let origin_col = ((layer.geotransform[0] - mosaic_min_x) / px).round() as isize;
            let origin_row = ((mosaic_max_y - layer.geotransform[3]) / py.abs()).round() as isize;
            for row in 0..layer.height {
                for col in 0..layer.width {
                    let v = layer.get(row, col);
                    if let Some(nd) = layer.nodata {
                        if v == nd {
                            continue;
                        }
                    }
                    let out_row = origin_row + row as isize;
                    let out_col = origin_col + col as isize;
                    if out_row < 0 || out_col < 0 || out_row as usize >= height || out_col as usize >= width {
                        continue;
                    }
                    data[out_row as usize * width + out_col as usize] = v;
                }
            }
        }

        Ok(RasterLayer {
            data,
            width,
            height,
            crs,
            geotransform: [mosaic_min_x, px, 0.0, mosaic_max_y, 0.0, py],
            nodata,
        })
    }
}
