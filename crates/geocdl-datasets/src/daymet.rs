//! Daymet V4 (`library/datasets/daymet.py`): native Lambert Conformal
//! Conic CRS, 1km grid, annual/monthly/daily coverage over North America.

use crate::grid::{bbox_intersects, synth_points, synth_raster};
use chrono::NaiveDate;
use geocdl_catalog::{Dataset, DatasetCapabilities};
use geocdl_common::{Crs, DataLayer, GeoCdlResult, Grain, GridUnit, InterpMethod, RequestDate, SubsetGeom};
use std::collections::{BTreeMap, BTreeSet};

/// Daymet's LCC coverage extent, in its own projected meters.
const DAYMET_BOUNDS: (f64, f64, f64, f64) = (-2_500_000.0, -2_000_000.0, 3_000_000.0, 1_500_000.0);

pub struct Daymet {
    caps: DatasetCapabilities,
}

impl Daymet {
    pub fn new() -> Self {
        let mut supported_grains = BTreeSet::new();
        supported_grains.insert(Grain::Annual);
        supported_grains.insert(Grain::Monthly);
        supported_grains.insert(Grain::Daily);

        let mut date_ranges = BTreeMap::new();
        date_ranges.insert(Grain::Annual, (NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()));
        date_ranges.insert(Grain::Monthly, (NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2020, 12, 1).unwrap()));
        date_ranges.insert(Grain::Daily, (NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2020, 12, 31).unwrap()));

        Daymet {
            caps: DatasetCapabilities {
                id: "DaymetV4".into(),
                name: "Daymet Version 4".into(),
                nontemporal: false,
                supported_grains,
                date_ranges,
                crs: Crs::daymet_lcc(),
                grid_size: 1000.0,
                grid_unit: GridUnit::Meters,
                categorical: false,
                variable_categories: BTreeMap::new(),
                publish: true,
            },
        }
    }
}

impl Default for Daymet {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset for Daymet {
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
        if !bbox_intersects(geom, DAYMET_BOUNDS) {
            return Ok(None);
        }

        // Daily/monthly values layer onto the annual signal the way the
        // reference implementation's multi-file-per-year layout does: each
        // finer grain concatenates as a separate slice of the same field.
        let day_component = date.and_then(|d| d.day).unwrap_or(0) as f64;
        let month_component = date.and_then(|d| d.month).unwrap_or(1) as f64;
        let value_fn = move |x: f64, y: f64, year: i32| {
            let base = if variable == "prcp" { 3.0 } else { 12.0 };
            base + (x / 100_000.0).sin() * 5.0 + (y / 100_000.0).cos() * 5.0 + (year as f64 % 10.0) + month_component + day_component * 0.1
        };

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
    fn produces_raster_within_coverage() {
        let ds = Daymet::new();
        let geom = SubsetGeom::Polygon(SubsetPolygon {
            geom: Polygon::new(
                LineString::from(vec![
                    (-100_000.0, -100_000.0),
                    (100_000.0, -100_000.0),
                    (100_000.0, 100_000.0),
                    (-100_000.0, 100_000.0),
                    (-100_000.0, -100_000.0),
                ]),
                vec![],
            ),
            crs: Crs::daymet_lcc(),
        });
        let out = ds
            .get_data("prcp", Grain::Daily, Some(RequestDate::daily(2015, 6, 1)), InterpMethod::Nearest, &geom)
            .unwrap();
        assert!(out.unwrap().as_raster().is_some());
    }
}
