//! PRISM (§ `library/datasets/prism.py`): NAD83, 4km grid, CONUS-only
//! precipitation/temperature at annual/monthly grain.

use crate::grid::{bbox_intersects, synth_points, synth_raster};
use chrono::NaiveDate;
use geocdl_catalog::{Dataset, DatasetCapabilities};
use geocdl_common::{Crs, DataLayer, GeoCdlResult, Grain, GridUnit, InterpMethod, RequestDate, SubsetGeom};
use std::collections::{BTreeMap, BTreeSet};

/// Rough CONUS bounding box in NAD83 lon/lat.
const CONUS_BOUNDS: (f64, f64, f64, f64) = (-125.0, 24.0, -66.0, 50.0);

pub struct Prism {
    caps: DatasetCapabilities,
}

impl Prism {
    pub fn new() -> Self {
        let mut supported_grains = BTreeSet::new();
        supported_grains.insert(Grain::Annual);
        supported_grains.insert(Grain::Monthly);

        let mut date_ranges = BTreeMap::new();
        date_ranges.insert(Grain::Annual, (NaiveDate::from_ymd_opt(1895, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()));
        date_ranges.insert(Grain::Monthly, (NaiveDate::from_ymd_opt(1895, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()));

        Prism {
            caps: DatasetCapabilities {
                id: "PRISM".into(),
                name: "PRISM".into(),
                nontemporal: false,
                supported_grains,
                date_ranges,
                crs: Crs::nad83(),
                grid_size: 4000.0,
                grid_unit: GridUnit::Meters,
                categorical: false,
                variable_categories: BTreeMap::new(),
                publish: true,
            },
        }
    }
}

impl Default for Prism {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset for Prism {
    fn capabilities(&self) -> &DatasetCapabilities {
        &self.caps
    }

    fn get_data(
        &self,
        variable: &str,
        _grain: Grain,
        date: Option<RequestDate>,
        _interp: InterpMethod,
        geom: &SubsetGeom,
    ) -> GeoCdlResult<Option<DataLayer>> {
        self.check_crs(geom)?;
        if !bbox_intersects(geom, CONUS_BOUNDS) {
            return Ok(None);
        }

        let month_component = date.and_then(|d| d.month).unwrap_or(1) as f64;
        let value_fn = move |x: f64, y: f64, year: i32| {
            let base = if variable == "ppt" { 40.0 } else { 15.0 };
            base + 5.0 * (x / 10.0).sin() + 3.0 * (y / 10.0).cos() + (year as f64 % 10.0) + month_component
        };

        let pixel_degrees = self.caps.grid_size / 111_000.0;
        let layer = match geom {
            SubsetGeom::Polygon(_) => DataLayer::Raster(synth_raster(geom, pixel_degrees, date, value_fn)),
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

    fn conus_square() -> SubsetGeom {
        SubsetGeom::Polygon(SubsetPolygon {
            geom: Polygon::new(
                LineString::from(vec![(-100.0, 39.0), (-99.0, 39.0), (-99.0, 40.0), (-100.0, 40.0), (-100.0, 39.0)]),
                vec![],
            ),
            crs: Crs::nad83(),
        })
    }

    #[test]
    fn produces_raster_within_conus() {
        let ds = Prism::new();
        let out = ds
            .get_data("ppt", Grain::Annual, Some(RequestDate::annual(2010)), InterpMethod::Nearest, &conus_square())
            .unwrap();
        assert!(out.is_some());
        assert!(out.unwrap().as_raster().is_some());
    }

    #[test]
    fn sparse_outside_conus() {
        let ds = Prism::new();
        let geom = SubsetGeom::Polygon(SubsetPolygon {
            geom: Polygon::new(
                LineString::from(vec![(40.0, 40.0), (41.0, 40.0), (41.0, 41.0), (40.0, 41.0), (40.0, 40.0)]),
                vec![],
            ),
            crs: Crs::nad83(),
        });
        let out = ds.get_data("ppt", Grain::Annual, Some(RequestDate::annual(2010)), InterpMethod::Nearest, &geom).unwrap();
        assert!(out.is_none());
    }
}
