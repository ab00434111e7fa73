//! NASS Cropland Data Layer (`library/datasets/nass_cdl.py`): categorical
//! raster, CONUS Albers, annual only, carrying a RAT + colormap the
//! harmonization pipeline propagates into output files (§4.5.3).

use crate::grid::{bbox_intersects, synth_points, synth_raster};
use chrono::NaiveDate;
use geocdl_catalog::{Dataset, DatasetCapabilities};
use geocdl_common::{CategoricalMeta, Crs, DataLayer, GeoCdlResult, Grain, GridUnit, InterpMethod, RequestDate, Rgba, SubsetGeom};
use std::collections::{BTreeMap, BTreeSet};

/// CONUS Albers coverage extent, in meters.
const CONUS_ALBERS_BOUNDS: (f64, f64, f64, f64) = (-2_400_000.0, 200_000.0, 2_300_000.0, 3_200_000.0);

fn cdl_categories() -> CategoricalMeta {
    let mut rat = BTreeMap::new();
    rat.insert(0, "Background".to_string());
    rat.insert(1, "Corn".to_string());
    rat.insert(2, "Soybeans".to_string());
    rat.insert(3, "Wheat".to_string());
    rat.insert(4, "Alfalfa".to_string());

    let mut colormap = BTreeMap::new();
    colormap.insert(0, Rgba(0, 0, 0, 0));
    colormap.insert(1, Rgba(255, 211, 0, 255));
    colormap.insert(2, Rgba(38, 112, 0, 255));
    colormap.insert(3, Rgba(168, 112, 76, 255));
    colormap.insert(4, Rgba(112, 168, 0, 255));

    CategoricalMeta { rat, colormap }
}

pub struct NassCdl {
    caps: DatasetCapabilities,
}

impl NassCdl {
    pub fn new() -> Self {
        let mut supported_grains = BTreeSet::new();
        supported_grains.insert(Grain::Annual);

        let mut date_ranges = BTreeMap::new();
        date_ranges.insert(Grain::Annual, (NaiveDate::from_ymd_opt(2008, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()));

        let mut variable_categories = BTreeMap::new();
        variable_categories.insert("cdl".to_string(), cdl_categories());

        NassCdl {
            caps: DatasetCapabilities {
                id: "NASS_CDL".into(),
                name: "NASS Cropland Data Layer".into(),
                nontemporal: false,
                supported_grains,
                date_ranges,
                crs: Crs::conus_albers(),
                grid_size: 30.0,
                grid_unit: GridUnit::Meters,
                categorical: true,
                variable_categories,
                publish: true,
            },
        }
    }
}

impl Default for NassCdl {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset for NassCdl {
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
        if !bbox_intersects(geom, CONUS_ALBERS_BOUNDS) {
            return Ok(None);
        }

        let value_fn = |x: f64, y: f64, _year: i32| {
            let cell = ((x / 1000.0).floor() as i64 + (y / 1000.0).floor() as i64).rem_euclid(5);
            cell as f64
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
    fn categorical_capability_carries_rat_and_colormap() {
        let ds = NassCdl::new();
        let meta = ds.capabilities().categories_for("cdl").unwrap();
        assert_eq!(meta.rat.get(&1).unwrap(), "Corn");
        assert!(meta.colormap.contains_key(&1));
    }

    #[test]
    fn produces_integer_class_codes() {
        let ds = NassCdl::new();
        let geom = SubsetGeom::Polygon(SubsetPolygon {
            geom: Polygon::new(
                LineString::from(vec![
                    (-1_000_000.0, 1_800_000.0),
                    (-990_000.0, 1_800_000.0),
                    (-990_000.0, 1_810_000.0),
                    (-1_000_000.0, 1_810_000.0),
                    (-1_000_000.0, 1_800_000.0),
                ]),
                vec![],
            ),
            crs: Crs::conus_albers(),
        });
        let out = ds.get_data("cdl", Grain::Annual, Some(RequestDate::annual(2015)), InterpMethod::Nearest, &geom).unwrap();
        let raster = out.unwrap();
        let raster = raster.as_raster().unwrap();
        assert!(raster.data.iter().all(|v| (0.0..5.0).contains(v)));
    }
}
