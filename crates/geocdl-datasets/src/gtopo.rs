//! GTOPO30 (`library/datasets/gtopo.py`): non-temporal global elevation,
//! WGS84, tile-backed in the original via `TileSet` — here a single
//! always-available synthetic field stands in for the tile mosaic, since
//! dataset-specific file I/O is the out-of-scope collaborator (§1).

use crate::grid::{synth_points, synth_raster};
use geocdl_catalog::{Dataset, DatasetCapabilities};
use geocdl_common::{Crs, DataLayer, GeoCdlResult, Grain, GridUnit, InterpMethod, RequestDate, SubsetGeom};
use std::collections::{BTreeMap, BTreeSet};

pub struct Gtopo {
    caps: DatasetCapabilities,
}

impl Gtopo {
    pub fn new() -> Self {
        Gtopo {
            caps: DatasetCapabilities {
                id: "GTOPO30".into(),
                name: "Global 30 Arc-Second Elevation".into(),
                nontemporal: true,
                supported_grains: BTreeSet::new(),
                date_ranges: BTreeMap::new(),
                crs: Crs::wgs84(),
                grid_size: 25.0 / 3000.0,
                grid_unit: GridUnit::Degrees,
                categorical: false,
                variable_categories: BTreeMap::new(),
                publish: true,
            },
        }
    }
}

impl Default for Gtopo {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset for Gtopo {
    fn capabilities(&self) -> &DatasetCapabilities {
        &self.caps
    }

    fn get_data(
        &self,
        _variable: &str,
        _grain: Grain,
        date: Option<RequestDate>,
        _interp: InterpMethod,
        geom: &SubsetGeom,
    ) -> GeoCdlResult<Option<DataLayer>> {
        self.check_crs(geom)?;

        let value_fn = |x: f64, y: f64, _year: i32| 500.0 + 1500.0 * (y / 30.0).sin().abs() + 100.0 * (x / 30.0).cos();

        let layer = match geom {
            SubsetGeom::Polygon(_) => DataLayer::Raster(synth_raster(geom, self.caps.grid_size, date, value_fn)),
            SubsetGeom::MultiPoint(_) => DataLayer::Point(synth_points(geom, date, value_fn)),
        };
        Ok(Some(layer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};
    use geocdl_common::SubsetPolygon;

    #[test]
    fn nontemporal_raster_ignores_date() {
        let ds = Gtopo::new();
        assert!(ds.capabilities().nontemporal);
        let geom = SubsetGeom::Polygon(SubsetPolygon {
            geom: Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]), vec![]),
            crs: Crs::wgs84(),
        });
        let out = ds.get_data("elev", Grain::None, None, InterpMethod::Nearest, &geom).unwrap();
        assert!(out.unwrap().as_raster().is_some());
    }
}
